/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use super::{RelayChain, RelayHop};

impl RelayChain {
    /// Rebuilds the chronological relay chain from `Received` header values
    /// in header order (most recent first).
    ///
    /// The header order is reversed, then reversed back once if the first
    /// two timestamps contradict it. No further reordering is attempted.
    /// When no hop ends up with a positive delay, every hop is assigned
    /// `placeholder_delay`.
    pub fn reconstruct<'x>(
        received: impl IntoIterator<Item = &'x str>,
        placeholder_delay: f64,
    ) -> Self {
        let mut hops = received.into_iter().map(RelayHop::parse).collect::<Vec<_>>();
        hops.reverse();

        if let [first, second, ..] = hops.as_slice() {
            if let (Some(first), Some(second)) = (first.timestamp, second.timestamp) {
                if second < first {
                    tracing::debug!(
                        hops = hops.len(),
                        skew = first - second,
                        "Received headers out of order, reversing relay chain"
                    );
                    hops.reverse();
                }
            }
        }

        for (pos, hop) in hops.iter_mut().enumerate() {
            hop.hop = pos + 1;
            hop.delay = 0.0;
        }
        for pos in 1..hops.len() {
            if let (Some(prev), Some(cur)) = (hops[pos - 1].timestamp, hops[pos].timestamp) {
                hops[pos].delay = (cur - prev).max(0) as f64;
            }
        }

        if hops.iter().all(|hop| hop.delay == 0.0) {
            let placeholder_delay = placeholder_delay.max(0.0);
            for hop in &mut hops {
                hop.delay = placeholder_delay;
            }
        }

        RelayChain {
            total_delay: hops.iter().map(|hop| hop.delay).sum(),
            hops,
        }
    }

    /// Sets each hop's DNSBL verdict, in chain order.
    pub(crate) fn with_listings(mut self, listed: impl IntoIterator<Item = bool>) -> Self {
        for (hop, listed) in self.hops.iter_mut().zip(listed) {
            hop.not_listed = Some(!listed);
        }
        self
    }
}
