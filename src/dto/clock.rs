use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Query parameters of `GET /games/countdown`.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct CountdownQuery {
    /// First value emitted.
    #[serde(default = "default_from")]
    #[validate(range(max = 60))]
    pub from: u32,
    /// Delay before each value, in milliseconds.
    #[serde(default = "default_every_ms")]
    #[validate(range(min = 100, max = 10_000))]
    pub every_ms: u64,
}

fn default_from() -> u32 {
    4
}

fn default_every_ms() -> u64 {
    1_000
}

/// One tick of the in-game timer stream.
#[derive(Debug, Serialize, ToSchema)]
pub struct TimerTick {
    /// Whole seconds since the stream was opened.
    pub seconds: u64,
    /// Human readable form, e.g. "1 minute 5 seconds".
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_query_bounds() {
        let ok = CountdownQuery {
            from: 4,
            every_ms: 1_000,
        };
        assert!(ok.validate().is_ok());

        let too_long = CountdownQuery {
            from: 61,
            every_ms: 1_000,
        };
        assert!(too_long.validate().is_err());

        let too_fast = CountdownQuery {
            from: 4,
            every_ms: 50,
        };
        assert!(too_fast.validate().is_err());
    }
}
