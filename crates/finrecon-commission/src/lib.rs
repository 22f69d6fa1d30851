//! # finrecon-commission
//!
//! **Commission allocator.** Pure, deterministic, no side effects.
//!
//! Turns a policy (or active-rider) count into:
//! - a **breakdown** by category: operating allowance, joint mobilization
//!   pool, profit-share pool
//! - a **distribution** by party: platform, partner A, partner B
//!
//! Both partitions foot to the total commission exactly. All arithmetic is
//! checked `i64` minor units; equal-split remainders go to the platform.

pub mod allocator;

pub use allocator::CommissionAllocator;
