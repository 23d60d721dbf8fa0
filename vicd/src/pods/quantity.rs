/* -------------------------------------------------------------------------- *\
 *                |   █████╗ ██╗   ██╗██████╗  █████╗ ███████╗ |              *
 *                |  ██╔══██╗██║   ██║██╔══██╗██╔══██╗██╔════╝ |              *
 *                |  ███████║██║   ██║██████╔╝███████║█████╗   |              *
 *                |  ██╔══██║██║   ██║██╔══██╗██╔══██║██╔══╝   |              *
 *                |  ██║  ██║╚██████╔╝██║  ██║██║  ██║███████╗ |              *
 *                |  ╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝ |              *
 *                +--------------------------------------------+              *
 *                                                                            *
 *                         Distributed Systems Runtime                        *
 * -------------------------------------------------------------------------- *
 * Copyright 2022 - 2024, the aurae contributors                              *
 * SPDX-License-Identifier: Apache-2.0                                        *
\* -------------------------------------------------------------------------- */

//! Kubernetes resource quantities (`500m`, `1Gi`, `1.5`, `129e6`).

/// Parses a quantity into its plain numeric value. Returns `None` when the
/// input is not a quantity.
pub(crate) fn parse_quantity(input: &str) -> Option<f64> {
    let input = input.trim();
    let split = input
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-')))
        .unwrap_or(input.len());
    let (number, suffix) = input.split_at(split);

    if number.is_empty() || number == "." {
        return None;
    }
    let number: f64 = number.parse().ok()?;

    Some(number * multiplier(suffix)?)
}

fn multiplier(suffix: &str) -> Option<f64> {
    let binary = |exp: i32| Some(1024f64.powi(exp));
    let decimal = |exp: i32| Some(10f64.powi(exp));

    match suffix {
        "" => decimal(0),
        "Ki" => binary(1),
        "Mi" => binary(2),
        "Gi" => binary(3),
        "Ti" => binary(4),
        "Pi" => binary(5),
        "Ei" => binary(6),
        "n" => decimal(-9),
        "u" => decimal(-6),
        "m" => decimal(-3),
        "k" => decimal(3),
        "M" => decimal(6),
        "G" => decimal(9),
        "T" => decimal(12),
        "P" => decimal(15),
        "E" => decimal(18),
        exponent => {
            let exp = exponent
                .strip_prefix('e')
                .or_else(|| exponent.strip_prefix('E'))?;
            decimal(exp.parse().ok()?)
        }
    }
}

/// Number of whole cores, rounded up.
pub(crate) fn cpu_cores(input: &str) -> Option<i64> {
    parse_quantity(input).map(|cores| cores.ceil() as i64)
}

/// Number of bytes, rounded up.
pub(crate) fn bytes(input: &str) -> Option<i64> {
    parse_quantity(input).map(|bytes| bytes.ceil() as i64)
}
