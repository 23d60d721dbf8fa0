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

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_TAG: &str = "latest";

/// Metadata of a locally available image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Image id without the digest algorithm prefix.
    pub image_id: String,
    /// Top layer of the image, which containers are created on.
    pub layer_id: String,
    /// Repository name, e.g. `nginx` or `registry:5000/team/app`.
    pub name: String,
    /// Every `name:tag` the image is known by.
    pub tags: Vec<String>,
    /// Every `name@digest` the image was pulled by.
    #[serde(default)]
    pub digests: Vec<String>,
    pub config: ContainerDefaults,
}

/// Process defaults baked into an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefaults {
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: String,
    pub user: String,
    pub volumes: BTreeSet<String>,
    pub stop_signal: String,
}

impl ImageConfig {
    /// Whether `reference` names this image by id, id prefix, tag or
    /// digest. A digest reference never falls back to a tag.
    pub fn matches(&self, reference: &str) -> bool {
        if reference.contains('@') {
            return self.digests.iter().any(|d| d == reference);
        }

        let id = strip_digest_algorithm(reference);
        if !id.is_empty() && self.image_id.starts_with(id) {
            return true;
        }

        let (name, tag) = split_reference(reference);
        let tagged = format!("{name}:{}", tag.unwrap_or(DEFAULT_TAG));
        self.tags.iter().any(|t| *t == tagged)
    }
}

/// Drops a leading `sha256:`.
pub fn strip_digest_algorithm(id: &str) -> &str {
    id.strip_prefix("sha256:").unwrap_or(id)
}

/// Splits `name[:tag][@digest]` into name and version, where the version is
/// the digest when one is pinned and the tag otherwise. A colon that belongs
/// to a registry port is not a tag separator.
pub fn split_reference(reference: &str) -> (&str, Option<&str>) {
    let (reference, digest) = match reference.split_once('@') {
        Some((name, digest)) => (name, Some(digest)),
        None => (reference, None),
    };

    let (name, tag) = match reference.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, Some(tag)),
        _ => (reference, None),
    };

    (name, digest.or(tag))
}

/// Whether a version returned by [split_reference] is a digest.
pub fn is_digest(version: &str) -> bool {
    version.contains(':')
}

/// Joins a name and a version back into a reference.
pub fn join_reference(name: &str, version: &str) -> String {
    if version.is_empty() {
        name.to_string()
    } else if is_digest(version) {
        format!("{name}@{version}")
    } else {
        format!("{name}:{version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("nginx", "nginx", None; "bare name")]
    #[test_case("nginx:1.25", "nginx", Some("1.25"); "tagged")]
    #[test_case("registry:5000/app", "registry:5000/app", None; "registry port")]
    #[test_case("registry:5000/app:v2", "registry:5000/app", Some("v2"); "registry port and tag")]
    #[test_case("busybox@sha256:abc", "busybox", Some("sha256:abc"); "digest")]
    #[test_case("busybox:1.36@sha256:abc", "busybox", Some("sha256:abc"); "tag and digest")]
    #[test_case("registry:5000/app@sha256:abc", "registry:5000/app", Some("sha256:abc"); "registry port and digest")]
    #[test]
    fn references_split(reference: &str, name: &str, tag: Option<&str>) {
        assert_eq!(split_reference(reference), (name, tag));
    }

    #[test]
    fn image_matches_ids_and_tags() {
        let image = ImageConfig {
            image_id: "f6e427c148a766d2".into(),
            name: "busybox".into(),
            tags: vec!["busybox:latest".into()],
            ..Default::default()
        };

        assert!(image.matches("busybox"));
        assert!(image.matches("busybox:latest"));
        assert!(image.matches("f6e427c1"));
        assert!(image.matches("sha256:f6e427c148a766d2"));
        assert!(!image.matches("busybox:1.36"));
        assert!(!image.matches("nginx"));
    }

    #[test]
    fn digest_reference_only_matches_pinned_digest() {
        let image = ImageConfig {
            image_id: "f6e427c148a766d2".into(),
            name: "busybox".into(),
            tags: vec!["busybox:latest".into()],
            digests: vec!["busybox@sha256:1111".into()],
            ..Default::default()
        };

        assert!(image.matches("busybox@sha256:1111"));
        assert!(!image.matches("busybox@sha256:2222"));
        assert_eq!(join_reference("busybox", "sha256:1111"), "busybox@sha256:1111");
        assert_eq!(join_reference("busybox", "1.36"), "busybox:1.36");
        assert_eq!(join_reference("busybox", ""), "busybox");
    }
}
