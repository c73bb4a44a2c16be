//! Windowgate - Per-Key Fixed-Window Rate Limiting
//!
//! This crate implements an in-process rate limiter that tracks admissions per
//! caller-supplied key inside fixed windows. Each key's window opens with its
//! first admission and resets wholesale once it elapses. Several limiters with
//! different quotas can run side by side through a [`ratelimit::LimiterSet`].

pub mod config;
pub mod error;
pub mod ratelimit;
