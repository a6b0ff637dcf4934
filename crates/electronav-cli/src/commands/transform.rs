//! Transform command implementation

use crate::cli::TransformArgs;
use crate::output::{fmt_point, OutputWriter};
use crate::output_types::TransformOutput;
use anyhow::{Context, Result};
use electronav_geo::transform::RigidTransform;

pub fn execute(args: &TransformArgs, output: &OutputWriter) -> Result<()> {
    let transform = RigidTransform::load(&args.file)
        .with_context(|| format!("Failed to load transform {}", args.file.display()))?;

    let input = [args.x, args.y, args.z];
    let mapped = if args.inverse {
        transform.apply_inverse_point(input)
    } else {
        transform.apply_point(input)
    };

    if output.is_json() {
        return output.result(TransformOutput { input, output: mapped, inverse: args.inverse });
    }

    let (from, to) = if args.inverse { ("scanner", "chamber") } else { ("chamber", "scanner") };
    output.kv(format!("Input ({})", from), fmt_point(input));
    output.kv(format!("Output ({})", to), fmt_point(mapped));
    Ok(())
}
