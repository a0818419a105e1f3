// SPDX-License-Identifier: MIT
pub mod app;
pub mod layout;
pub mod panels;
pub mod theme;
