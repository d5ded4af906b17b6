use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

/// Token-bucket state for a single nameserver.
///
/// Tokens refill continuously at `rate` per second up to `capacity`.
/// Accounting happens only under the lock; waiting happens outside it, so
/// a token is consumed exactly once no matter how many tasks contend.
#[derive(Debug)]
pub struct TokenBucket {
	rate: f64,
	capacity: f64,
	state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
	tokens: f64,
	last_refill: Instant,
}

impl TokenBucket {
	pub fn new(rate: f64, capacity: f64) -> Self {
		TokenBucket {
			// Rate and capacity are floored so acquire always terminates
			rate: rate.max(0.001),
			capacity: capacity.max(1.0),
			state: Mutex::new(BucketState {
				// A fresh bucket starts full, allowing an initial burst
				tokens: capacity.max(1.0),
				last_refill: Instant::now(),
			}),
		}
	}

	/// Consume one token, suspending the calling task until one is available.
	///
	/// Never fails; only delays. A consumed token is not refunded even if the
	/// caller is later cancelled -- the query it paid for went on the wire.
	pub async fn acquire(&self) {
		loop {
			let wait = {
				let mut state = self.state.lock().unwrap();
				let now = Instant::now();
				let elapsed = now.duration_since(state.last_refill).as_secs_f64();
				state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
				state.last_refill = now;
				if state.tokens >= 1.0 {
					state.tokens -= 1.0;
					return;
				}
				// Sleep just long enough for the deficit to refill, then re-check.
				// Floored at 1ms so rounding can never produce a zero-length sleep.
				Duration::from_secs_f64(((1.0 - state.tokens) / self.rate).max(0.001))
			};
			tokio::time::sleep(wait).await;
		}
	}
}

/// Independent token buckets keyed by nameserver address.
///
/// Buckets are created lazily on first use and live for the process
/// lifetime. Construct once at startup and share via Arc; congestion on one
/// nameserver never throttles queries to another.
#[derive(Debug)]
pub struct RateLimiterSet {
	rate: f64,
	capacity: f64,
	buckets: Mutex<HashMap<SocketAddr, Arc<TokenBucket>>>,
}

impl RateLimiterSet {
	/// Create a limiter set granting `rate` requests/second per nameserver,
	/// with bursts up to `capacity`.
	pub fn new(rate: f64, capacity: f64) -> Self {
		RateLimiterSet {
			rate,
			capacity,
			buckets: Mutex::new(HashMap::new()),
		}
	}

	/// Block until a token is available for the given nameserver.
	pub async fn acquire(&self, nameserver: SocketAddr) {
		let bucket = self.bucket(nameserver);
		bucket.acquire().await;
	}

	/// Get or lazily create the bucket for a nameserver.
	pub fn bucket(&self, nameserver: SocketAddr) -> Arc<TokenBucket> {
		let mut buckets = self.buckets.lock().unwrap();
		buckets
			.entry(nameserver)
			.or_insert_with(|| Arc::new(TokenBucket::new(self.rate, self.capacity)))
			.clone()
	}

	/// Number of nameservers with an active bucket.
	#[allow(dead_code)]
	pub fn tracked_nameservers(&self) -> usize {
		self.buckets.lock().unwrap().len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn addr(s: &str) -> SocketAddr {
		s.parse().unwrap()
	}

	#[tokio::test(start_paused = true)]
	async fn test_burst_up_to_capacity_is_immediate() {
		let bucket = TokenBucket::new(10.0, 5.0);
		let start = Instant::now();
		for _ in 0..5 {
			bucket.acquire().await;
		}
		// No sleeps should have been needed for the initial burst
		assert_eq!(start.elapsed(), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn test_sustained_rate_is_bounded() {
		// capacity 5 burst + 10 refilled tokens at 10/s: 15 grants need ~1s
		let bucket = TokenBucket::new(10.0, 5.0);
		let start = Instant::now();
		for _ in 0..15 {
			bucket.acquire().await;
		}
		let elapsed = start.elapsed();
		assert!(elapsed >= Duration::from_millis(900), "elapsed {:?}", elapsed);
		assert!(elapsed <= Duration::from_millis(1200), "elapsed {:?}", elapsed);
	}

	#[tokio::test(start_paused = true)]
	async fn test_concurrent_acquires_grant_exactly_once() {
		// 20 tasks against rate 10/s, capacity 1: last grant lands near 1.9s.
		// If tokens were double-granted the total elapsed time would collapse.
		let bucket = Arc::new(TokenBucket::new(10.0, 1.0));
		let start = Instant::now();
		let mut handles = Vec::new();
		for _ in 0..20 {
			let bucket = bucket.clone();
			handles.push(tokio::spawn(async move {
				bucket.acquire().await;
			}));
		}
		for handle in handles {
			handle.await.unwrap();
		}
		let elapsed = start.elapsed();
		assert!(elapsed >= Duration::from_millis(1700), "elapsed {:?}", elapsed);
	}

	#[tokio::test(start_paused = true)]
	async fn test_buckets_are_independent() {
		let set = RateLimiterSet::new(1.0, 1.0);
		// Drain the bucket for the first nameserver
		set.acquire(addr("8.8.8.8:53")).await;
		// A different nameserver still grants immediately
		let start = Instant::now();
		set.acquire(addr("1.1.1.1:53")).await;
		assert_eq!(start.elapsed(), Duration::ZERO);
		assert_eq!(set.tracked_nameservers(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_bucket_reused_per_address() {
		let set = RateLimiterSet::new(30.0, 30.0);
		set.acquire(addr("9.9.9.9:53")).await;
		set.acquire(addr("9.9.9.9:53")).await;
		assert_eq!(set.tracked_nameservers(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_capacity_floor() {
		// A capacity below one token would deadlock acquire; it is floored
		let set = RateLimiterSet::new(5.0, 0.0);
		set.acquire(addr("8.8.4.4:53")).await;
	}
}
