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

//! Sizing of container VMs.

use super::error::{PodsError, Result};
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use tracing::{info, warn};

/// Container VM memory must align to this for memory hot-add.
pub const MEMORY_ALIGN_MB: i64 = 128;
pub const MEMORY_MIN_MB: i64 = 512;
pub const MEMORY_DEFAULT_MB: i64 = 2048;
pub const MIN_CPUS: i64 = 1;
pub const DEFAULT_CPUS: i64 = 2;

const MIB: i64 = 1024 * 1024;

/// Number of virtual CPUs of a container VM, at least [MIN_CPUS].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCount(i64);

impl CpuCount {
    /// An explicit count above zero is used as is. Otherwise the first
    /// entry of `cpuset` is taken as the count, and with neither the count
    /// defaults to [DEFAULT_CPUS].
    pub fn normalize(cpu_count: i64, cpuset: &str) -> Result<Self> {
        let mut count = DEFAULT_CPUS;

        if cpu_count > 0 {
            count = cpu_count;
        } else if !cpuset.is_empty() {
            let first = cpuset.split(',').next().unwrap_or_default();
            count = first.trim().parse().map_err(
                |e: std::num::ParseIntError| PodsError::InvalidCpuSet {
                    cpuset: cpuset.to_string(),
                    reason: e.to_string(),
                },
            )?;
        }

        let count = Self(count.max(MIN_CPUS));
        info!("container cpu count: {count}");
        Ok(count)
    }

    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl Deref for CpuCount {
    type Target = i64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for CpuCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Memory of a container VM in MiB: at least [MEMORY_MIN_MB] and a multiple
/// of [MEMORY_ALIGN_MB].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMb(i64);

impl MemoryMb {
    /// `bytes` of zero selects [MEMORY_DEFAULT_MB].
    pub fn from_bytes(bytes: i64) -> Self {
        let mut memory_mb = bytes / MIB;
        if memory_mb == 0 {
            memory_mb = MEMORY_DEFAULT_MB;
        } else if memory_mb < MEMORY_MIN_MB {
            memory_mb = MEMORY_MIN_MB;
        }

        let remainder = memory_mb % MEMORY_ALIGN_MB;
        if remainder != 0 {
            warn!(
                "container memory must be {MEMORY_ALIGN_MB} MB aligned, rounding {memory_mb} MB up"
            );
            memory_mb += MEMORY_ALIGN_MB - remainder;
        }

        let memory_mb = Self(memory_mb);
        info!("container memory: {memory_mb} MB");
        memory_mb
    }

    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl Deref for MemoryMb {
    type Target = i64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for MemoryMb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
