use std::time::Duration;

/// Fault-injection constants of a [`Network`](crate::Network).
///
/// They only matter once the network is made unreliable or long reordering
/// is switched on; a reliable network never delays nor drops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetConfig {
    /// Lower bound of the jitter an unreliable call waits before it is
    /// delivered.
    pub short_delay_min: Duration,
    /// Upper bound (exclusive) of the jitter an unreliable call waits before
    /// it is delivered.
    pub short_delay_max: Duration,
    /// Chance, out of 1000, that an unreliable request never reaches the
    /// server.
    pub request_drop_per_mille: u32,
    /// Chance, out of 1000, that the reply of an unreliable request is lost
    /// after the handler ran.
    pub reply_drop_per_mille: u32,
    /// Chance, out of 1000, that a reply is held back while long reordering
    /// is on.
    pub long_reordering_per_mille: u32,
    /// Minimum hold of a reordered reply.
    pub long_reordering_base: Duration,
    /// Upper bound of the random extra hold of a reordered reply.
    pub long_reordering_spread: Duration,
    /// How often an in-flight call checks whether its server went away.
    pub dead_check_interval: Duration,
}

impl Default for NetConfig {
    fn default() -> NetConfig {
        NetConfig {
            short_delay_min: Duration::from_millis(0),
            short_delay_max: Duration::from_millis(27),
            request_drop_per_mille: 100,
            reply_drop_per_mille: 100,
            long_reordering_per_mille: 666,
            long_reordering_base: Duration::from_millis(200),
            long_reordering_spread: Duration::from_millis(2000),
            dead_check_interval: Duration::from_millis(100),
        }
    }
}

impl NetConfig {
    /// A config whose unreliable mode drops nothing, only jitters.
    pub fn lossless() -> NetConfig {
        NetConfig {
            request_drop_per_mille: 0,
            reply_drop_per_mille: 0,
            ..NetConfig::default()
        }
    }
}
