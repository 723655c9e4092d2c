// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn burst_capacity_is_fully_available_up_front() {
    let limiter = RateLimiter::new(RateLimitConfig::new(1.0, 3.0), RateLimitConfig::new(100.0, 100.0));
    assert!(limiter.check_and_consume("ns"));
    assert!(limiter.check_and_consume("ns"));
    assert!(limiter.check_and_consume("ns"));
    assert!(!limiter.check_and_consume("ns"), "burst of 3 should be exhausted on the 4th call");
}

#[test]
fn namespaces_have_independent_buckets() {
    let limiter = RateLimiter::new(RateLimitConfig::new(1000.0, 1000.0), RateLimitConfig::new(1.0, 1.0));
    assert!(limiter.check_and_consume("a"));
    assert!(!limiter.check_and_consume("a"));
    assert!(limiter.check_and_consume("b"), "namespace b must have its own untouched bucket");
}

#[test]
fn global_bucket_denial_blocks_every_namespace() {
    let limiter = RateLimiter::new(RateLimitConfig::new(1.0, 1.0), RateLimitConfig::new(1000.0, 1000.0));
    assert!(limiter.check_and_consume("a"));
    assert!(!limiter.check_and_consume("b"), "exhausted global bucket must deny other namespaces too");
}

#[test]
fn custom_namespace_limit_overrides_default() {
    let limiter = RateLimiter::new(RateLimitConfig::new(1000.0, 1000.0), RateLimitConfig::new(1.0, 1.0));
    limiter.set_namespace_limit("a", RateLimitConfig::new(0.0, 5.0));
    for _ in 0..5 {
        assert!(limiter.check_and_consume("a"));
    }
    assert!(!limiter.check_and_consume("a"), "override burst of 5 with zero refill should now be exhausted");
}

#[test]
fn removing_custom_limit_reverts_to_default() {
    let limiter = RateLimiter::new(RateLimitConfig::new(1000.0, 1000.0), RateLimitConfig::new(0.0, 1.0));
    limiter.set_namespace_limit("a", RateLimitConfig::new(1000.0, 1000.0));
    assert!(limiter.check_and_consume("a"));
    assert!(limiter.check_and_consume("a"));

    limiter.remove_namespace_limit("a");
    assert!(limiter.check_and_consume("a"), "fresh bucket under the reverted default should allow one call");
    assert!(!limiter.check_and_consume("a"), "reverted default burst of 1 should now be exhausted");
}
