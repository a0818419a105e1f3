// SPDX-License-Identifier: MIT
pub mod hook;
pub mod sampler;
pub mod snapshot;
