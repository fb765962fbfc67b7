// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod analysis_worker;
pub mod expiration_worker;
pub mod manager;
