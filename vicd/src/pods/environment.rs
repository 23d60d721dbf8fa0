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

//! Container environment assembly.

use std::collections::HashMap;

pub const DEFAULT_ENV_PATH: &str =
    "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

fn key(entry: &str) -> &str {
    entry.split_once('=').map_or(entry, |(key, _)| key)
}

fn has(env: &[String], wanted: &str) -> bool {
    env.iter().any(|entry| key(entry) == wanted)
}

/// Appends `entry`, or overwrites the earlier entry with the same key in
/// place.
fn upsert(
    env: &mut Vec<String>,
    positions: &mut HashMap<String, usize>,
    entry: &str,
) {
    match positions.get(key(entry)) {
        Some(&at) => env[at] = entry.to_string(),
        None => {
            let _ = positions.insert(key(entry).to_string(), env.len());
            env.push(entry.to_string());
        }
    }
}

/// Builds the final `KEY=value` list from the user's and the image's
/// variables.
///
/// User variables come first and win; a repeated user key keeps its first
/// position with its last value. The result carries exactly one `PATH`,
/// taken from the user, the image or [DEFAULT_ENV_PATH] in that order. With
/// a tty and no `TERM`, `TERM=xterm` is added. Image variables the user did
/// not set are appended.
pub fn merge_environment(
    tty: bool,
    user_env: &[String],
    image_env: &[String],
) -> Vec<String> {
    let mut env = Vec::with_capacity(user_env.len() + 2);
    let mut positions = HashMap::new();

    for entry in user_env {
        upsert(&mut env, &mut positions, entry);
    }

    if !has(&env, "PATH") {
        match image_env.iter().find(|entry| key(entry) == "PATH") {
            Some(path) => upsert(&mut env, &mut positions, path),
            None => upsert(
                &mut env,
                &mut positions,
                &format!("PATH={DEFAULT_ENV_PATH}"),
            ),
        }
    }

    if tty && !has(&env, "TERM") {
        upsert(&mut env, &mut positions, "TERM=xterm");
    }

    for entry in image_env {
        if !has(&env, key(entry)) {
            upsert(&mut env, &mut positions, entry);
        }
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn count(env: &[String], wanted: &str) -> usize {
        env.iter().filter(|entry| key(entry) == wanted).count()
    }

    #[test]
    fn default_path_when_nobody_sets_one() {
        let env = merge_environment(false, &[], &[]);
        assert_eq!(env, vec![format!("PATH={DEFAULT_ENV_PATH}")]);
    }

    #[test]
    fn user_values_win_over_image() {
        let env = merge_environment(
            true,
            &strings(&["PATH=/opt/bin", "MODE=dev", "TERM=vt100"]),
            &strings(&["PATH=/usr/bin", "MODE=prod", "LANG=C.UTF-8"]),
        );

        assert_eq!(
            env,
            strings(&["PATH=/opt/bin", "MODE=dev", "TERM=vt100", "LANG=C.UTF-8"])
        );
    }

    #[test]
    fn image_path_is_used_before_default() {
        let env = merge_environment(
            false,
            &strings(&["MODE=dev"]),
            &strings(&["PATH=/usr/bin", "LANG=C.UTF-8"]),
        );

        assert_eq!(env, strings(&["MODE=dev", "PATH=/usr/bin", "LANG=C.UTF-8"]));
    }

    #[test]
    fn tty_adds_term() {
        let env = merge_environment(true, &[], &[]);
        assert_eq!(count(&env, "TERM"), 1);
        assert!(env.contains(&"TERM=xterm".to_string()));
    }

    #[test]
    fn repeated_user_keys_collapse() {
        let env = merge_environment(
            false,
            &strings(&["A=1", "PATH=/a", "A=2", "PATH=/b"]),
            &strings(&["PATH=/image"]),
        );

        assert_eq!(env, strings(&["A=2", "PATH=/b"]));
        assert_eq!(count(&env, "PATH"), 1);
    }
}
