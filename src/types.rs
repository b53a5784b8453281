//! Small, copyable identifier and enum types shared across the crate.

use std::fmt;

/// Opaque identifier returned by the broker at entry.
///
/// Packed as `[timestamp:64][random:32][counter:32]`, the same shape used
/// for broker-facing order ids elsewhere in this codebase: unique across
/// threads and time without a central allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct OrderId(pub u128);



impl OrderId {
    #[inline(always)]
    pub const fn new(id: u128) -> Self {
        Self(id)
    }

    /// Generate a new random order id.
    ///
    /// Measured at ~60-70ns, dominated by `SystemTime::now()`. This is not
    /// called on the tick hot path (only when a leg is added), so the cost
    /// is not performance-sensitive here.
    pub fn generate() -> Self {
        use rand::Rng;
        use std::time::SystemTime;

        thread_local! {
            static COUNTER: std::cell::Cell<u32> = std::cell::Cell::new(0);
            static RNG: std::cell::RefCell<rand::rngs::ThreadRng> =
                std::cell::RefCell::new(rand::thread_rng());
        }

        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_else(|_| std::time::Duration::from_nanos(0))
            .as_nanos() as u64;

        let random_part = RNG.with(|rng| rng.borrow_mut().gen::<u32>());
        let counter = COUNTER.with(|c| {
            let val = c.get();
            c.set(val.wrapping_add(1));
            val
        });

        let id = ((timestamp as u128) << 64) | ((random_part as u128) << 32) | (counter as u128);
        Self(id)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl From<u128> for OrderId {
    fn from(id: u128) -> Self {
        Self(id)
    }
}

/// Identifies a user for callback routing and thread-local context restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct UserId(pub u64);

/// Identifies one active position's monitor. Opaque and unique per position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ExecutionId(pub u64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer key used by the market-data transport to identify an instrument.
pub type InstrumentToken = u64;

/// Whether a leg is a call or a put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// The opposite side, used when constructing a replacement leg.
    #[inline(always)]
    pub const fn opposite(self) -> OptionType {
        match self {
            OptionType::Call => OptionType::Put,
            OptionType::Put => OptionType::Call,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "CALL"),
            OptionType::Put => write!(f, "PUT"),
        }
    }
}

/// Position direction; determines the sign applied to P&L in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// `+1` for LONG, `-1` for SHORT, pre-computed once at monitor
    /// construction so the hot path never branches on direction again.
    #[inline(always)]
    pub const fn multiplier(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// A single price update for one instrument token.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub instrument_token: InstrumentToken,
    pub last_traded_price: f64,
    pub arrival_time: std::time::SystemTime,
}

impl Tick {
    pub fn new(instrument_token: InstrumentToken, last_traded_price: f64) -> Self {
        Self {
            instrument_token,
            last_traded_price,
            arrival_time: std::time::SystemTime::now(),
        }
    }
}
