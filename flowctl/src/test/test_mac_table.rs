// flowctl: Packet-In Decision Core for OpenFlow Controllers
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Test the MAC learning table

use crate::controller::mac_table::*;
use crate::controller::{MacAddr, SwitchId};
use lazy_static::lazy_static;
use std::time::{Duration, Instant};

lazy_static! {
    static ref A: MacAddr = "aa:aa:aa:aa:aa:aa".parse().unwrap();
    static ref B: MacAddr = "be:be:be:be:be:be".parse().unwrap();
}

const S1: SwitchId = SwitchId(1);
const S2: SwitchId = SwitchId(2);

#[test]
fn test_learn_idempotent() {
    let now = Instant::now();
    let mut once = MacLearningTable::new();
    assert_eq!(once.learn(S1, *A, 3, now), LearnOutcome::New);

    let mut twice = MacLearningTable::new();
    assert_eq!(twice.learn(S1, *A, 3, now), LearnOutcome::New);
    assert_eq!(twice.learn(S1, *A, 3, now), LearnOutcome::Refreshed);

    assert_eq!(once.len(S1), 1);
    assert_eq!(twice.len(S1), 1);
    assert_eq!(once.get_entry(S1, *A), twice.get_entry(S1, *A));
    assert_eq!(twice.lookup(S1, *A, now), Some(3));
}

#[test]
fn test_replace_on_relearn() {
    let now = Instant::now();
    let mut t = MacLearningTable::new();
    t.learn(S1, *A, 1, now);
    assert_eq!(t.learn(S1, *A, 2, now), LearnOutcome::Moved { from: 1 });
    assert_eq!(t.len(S1), 1);
    assert_eq!(t.lookup(S1, *A, now), Some(2));
    assert!(LearnOutcome::Moved { from: 1 }.is_changed());
    assert!(!LearnOutcome::Refreshed.is_changed());
}

#[test]
fn test_switches_are_independent() {
    let now = Instant::now();
    let mut t = MacLearningTable::new();
    t.learn(S1, *A, 1, now);
    t.learn(S2, *B, 4, now);
    assert_eq!(t.lookup(S1, *A, now), Some(1));
    assert_eq!(t.lookup(S2, *A, now), None);
    assert_eq!(t.lookup(S1, *B, now), None);
    assert_eq!(t.lookup(S2, *B, now), Some(4));

    t.remove_switch(S1);
    assert!(t.is_empty(S1));
    assert_eq!(t.lookup(S2, *B, now), Some(4));
}

#[test]
fn test_aging() {
    let t0 = Instant::now();
    let mut t = MacLearningTable::with_max_age(Some(Duration::from_secs(10)));
    assert_eq!(t.max_age(), Some(Duration::from_secs(10)));
    t.learn(S1, *A, 1, t0);
    t.learn(S1, *B, 2, t0 + Duration::from_secs(8));

    assert_eq!(t.lookup(S1, *A, t0 + Duration::from_secs(5)), Some(1));
    assert_eq!(t.lookup(S1, *A, t0 + Duration::from_secs(10)), None);
    assert_eq!(t.lookup(S1, *B, t0 + Duration::from_secs(10)), Some(2));

    // an expired entry is learned as new, even on the same port
    assert_eq!(t.learn(S1, *A, 1, t0 + Duration::from_secs(11)), LearnOutcome::New);

    assert_eq!(t.expire(t0 + Duration::from_secs(19)), 1);
    assert_eq!(t.len(S1), 1);
    assert_eq!(t.lookup(S1, *A, t0 + Duration::from_secs(19)), Some(1));
}

#[test]
fn test_zero_max_age_never_expires() {
    let t0 = Instant::now();
    let mut t = MacLearningTable::with_max_age(Some(Duration::from_secs(0)));
    assert_eq!(t.max_age(), None);
    t.learn(S1, *A, 1, t0);
    assert_eq!(t.lookup(S1, *A, t0 + Duration::from_secs(100_000)), Some(1));
    assert_eq!(t.expire(t0 + Duration::from_secs(100_000)), 0);
}
