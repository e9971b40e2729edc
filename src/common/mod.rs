/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

pub mod address;
pub mod headers;
pub mod ip;
pub(crate) mod lru;
pub(crate) mod parse;
pub mod resolver;
