// SPDX-License-Identifier: MIT
pub mod perf_stats;
pub mod process;
