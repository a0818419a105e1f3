// SPDX-License-Identifier: MIT
pub mod estimator;
pub mod state;
