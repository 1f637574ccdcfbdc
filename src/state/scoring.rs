//! Point awards for submitted answers.

/// Points granted for any correct answer.
pub const BASE_POINTS: u32 = 1000;
/// Speed bonus granted per second left on the clock.
pub const BONUS_PER_SECOND: f64 = 10.0;

/// Compute the award for an answer given the time the client reported as remaining.
///
/// Correct answers earn `1000 + floor(time_remaining * 10)`; wrong answers earn nothing.
/// Reported times that cannot describe a remaining duration (negative, NaN, infinite)
/// earn no speed bonus. Absurdly large times are capped so the award never exceeds
/// `u32::MAX`.
pub fn score_answer(correct: bool, time_remaining_secs: f64) -> u32 {
    if !correct {
        return 0;
    }
    BASE_POINTS.saturating_add(speed_bonus(time_remaining_secs))
}

fn speed_bonus(time_remaining_secs: f64) -> u32 {
    if !time_remaining_secs.is_finite() || time_remaining_secs <= 0.0 {
        return 0;
    }
    let max_bonus = f64::from(u32::MAX - BASE_POINTS);
    (time_remaining_secs * BONUS_PER_SECOND).floor().min(max_bonus) as u32
}
