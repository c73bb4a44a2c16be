//! One limiter per profile, owned together.

use tracing::info;

use super::clock::{Clock, SystemClock};
use super::limiter::RateLimiter;
use super::profiles::{Profile, ProfilesConfig};

/// The limiters an application hands to its request paths.
///
/// Each profile owns its own registry, so exhausting one concern never
/// affects another.
pub struct LimiterSet<C: Clock + Clone = SystemClock> {
    api: RateLimiter<C>,
    auth: RateLimiter<C>,
    search: RateLimiter<C>,
    upload: RateLimiter<C>,
}

impl LimiterSet<SystemClock> {
    /// Build the set on the system clock.
    pub fn new(config: &ProfilesConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock + Clone> LimiterSet<C> {
    /// Build the set with a shared time source.
    pub fn with_clock(config: &ProfilesConfig, clock: C) -> Self {
        info!(
            api = ?config.api,
            auth = ?config.auth,
            search = ?config.search,
            upload = ?config.upload,
            "Limiter set initialized"
        );

        Self {
            api: RateLimiter::with_clock(config.api, clock.clone()),
            auth: RateLimiter::with_clock(config.auth, clock.clone()),
            search: RateLimiter::with_clock(config.search, clock.clone()),
            upload: RateLimiter::with_clock(config.upload, clock),
        }
    }

    /// The limiter for a profile.
    pub fn get(&self, profile: Profile) -> &RateLimiter<C> {
        match profile {
            Profile::Api => &self.api,
            Profile::Auth => &self.auth,
            Profile::Search => &self.search,
            Profile::Upload => &self.upload,
        }
    }

    /// General API limiter.
    pub fn api(&self) -> &RateLimiter<C> {
        &self.api
    }

    /// Authentication attempt limiter.
    pub fn auth(&self) -> &RateLimiter<C> {
        &self.auth
    }

    /// Search limiter.
    pub fn search(&self) -> &RateLimiter<C> {
        &self.search
    }

    /// Upload limiter.
    pub fn upload(&self) -> &RateLimiter<C> {
        &self.upload
    }

    /// Clear every limiter in the set.
    pub fn clear_all(&self) {
        for profile in Profile::ALL {
            self.get(profile).clear_all();
        }
    }

    /// Purge expired records from every limiter, returning the total removed.
    pub fn purge_expired(&self) -> usize {
        Profile::ALL
            .into_iter()
            .map(|profile| self.get(profile).purge_expired())
            .sum()
    }
}

impl Default for LimiterSet<SystemClock> {
    fn default() -> Self {
        Self::new(&ProfilesConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;

    fn create_test_set() -> (LimiterSet<ManualClock>, ManualClock) {
        let clock = ManualClock::new(0);
        let set = LimiterSet::with_clock(&ProfilesConfig::default(), clock.clone());
        (set, clock)
    }

    #[test]
    fn test_profiles_use_their_own_quota() {
        let (set, _) = create_test_set();

        assert_eq!(set.api().config().max_requests, 100);
        assert_eq!(set.auth().config().max_requests, 5);
        assert_eq!(set.search().config().max_requests, 30);
        assert_eq!(set.upload().config().max_requests, 10);
        assert_eq!(set.get(Profile::Auth).config().window_ms, 900_000);
    }

    #[test]
    fn test_profiles_do_not_interfere() {
        let (set, _) = create_test_set();

        for _ in 0..5 {
            assert!(set.auth().check_limit("alice"));
        }
        assert!(!set.auth().check_limit("alice"));

        assert!(set.api().check_limit("alice"));
        assert_eq!(set.search().get_remaining("alice"), 30);
    }

    #[test]
    fn test_auth_window_is_fifteen_minutes() {
        let (set, clock) = create_test_set();

        for _ in 0..6 {
            set.auth().check_limit("alice");
        }
        assert_eq!(set.auth().retry_after_secs("alice"), 900);

        clock.advance(899_999);
        assert!(!set.auth().check_limit("alice"));

        clock.advance(1);
        assert!(set.auth().check_limit("alice"));
    }

    #[test]
    fn test_clear_all_and_purge() {
        let (set, clock) = create_test_set();

        set.api().check_limit("a");
        set.upload().check_limit("a");
        clock.advance(60_000);
        assert_eq!(set.purge_expired(), 2);

        set.auth().check_limit("a");
        set.clear_all();
        assert_eq!(set.auth().tracked_keys(), 0);
    }
}
