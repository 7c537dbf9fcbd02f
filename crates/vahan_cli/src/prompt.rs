use std::io::{BufRead, Write};

use anyhow::bail;
use vahan_core::{Axis, SelectOption};

/// Ask for one of `options` by number. Unparseable or out-of-range answers
/// are asked again; end of input is an error.
pub fn choose<R: BufRead, W: Write>(
    axis: Axis,
    options: &[SelectOption],
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<SelectOption> {
    if options.is_empty() {
        bail!("no {axis} options to choose from");
    }
    writeln!(output, "{axis} options:")?;
    for (i, option) in options.iter().enumerate() {
        writeln!(output, "  {:>2}) {}", i + 1, option.label)?;
    }

    let mut line = String::new();
    loop {
        write!(output, "Choose {axis} [1-{}]: ", options.len())?;
        output.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            bail!("no {axis} chosen");
        }
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(options[n - 1].clone()),
            _ => writeln!(output, "'{}' is not a listed number", line.trim())?,
        }
    }
}
