use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div};

use serde::{de, ser, Deserialize, Serialize};

/// Delay in minutes as recorded in the Deutsche Bahn punctuality data.
/// Fractional minutes appear as soon as readings are averaged.
/// # Examples
/// ```rust
/// use delay_graph::delay::Delay;
/// assert_eq!(Delay::minutes(1.5) + Delay::minutes(2.5), Delay::minutes(4.0));
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct Delay {
    minutes: f64,
}

/// A stop counts as on time below six minutes of delay, the threshold
/// Deutsche Bahn uses for its punctuality statistics
pub const ON_TIME_LIMIT: Delay = Delay { minutes: 6.0 };

impl Delay {
    /// Construct a delay of a number of minutes
    pub fn minutes(minutes: f64) -> Delay {
        Delay { minutes }
    }

    /// Convert to minutes
    pub fn to_mins(&self) -> f64 {
        self.minutes
    }

    /// Which side of the on-time allowance this delay falls on
    pub fn punctuality(self) -> Punctuality {
        if self.minutes < ON_TIME_LIMIT.minutes {
            Punctuality::OnTime
        } else {
            Punctuality::Delayed
        }
    }

    pub fn is_delayed(self) -> bool {
        self.punctuality() == Punctuality::Delayed
    }
}

impl Add<Delay> for Delay {
    type Output = Delay;

    /// Add two `Delay`s
    #[inline(always)]
    fn add(self, rhs: Delay) -> Self::Output {
        Delay::minutes(self.minutes + rhs.minutes)
    }
}

impl AddAssign<Delay> for Delay {
    /// Add two `Delay`s
    #[inline(always)]
    fn add_assign(&mut self, rhs: Delay) {
        self.minutes += rhs.minutes;
    }
}

impl Div<f64> for Delay {
    type Output = Delay;

    /// Divide a delay evenly, as when averaging
    #[inline(always)]
    fn div(self, rhs: f64) -> Self::Output {
        Delay::minutes(self.minutes / rhs)
    }
}

impl Sum for Delay {
    fn sum<I: Iterator<Item = Delay>>(iter: I) -> Delay {
        iter.fold(Delay::minutes(0.0), |acc, delay| acc + delay)
    }
}

impl ser::Serialize for Delay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        self.minutes.serialize(serializer)
    }
}

impl<'de> de::Deserialize<'de> for Delay {
    fn deserialize<D>(deserializer: D) -> Result<Delay, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        de::Deserialize::deserialize(deserializer).map(|minutes| Delay { minutes })
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} min", self.minutes)
    }
}

/// Whether a delay is within Deutsche Bahn's on-time allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Punctuality {
    OnTime,
    Delayed,
}

impl fmt::Display for Punctuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Punctuality::OnTime => "on time",
            Punctuality::Delayed => "delayed",
        })
    }
}

/// Mean of a sequence of delays, `None` when the sequence is empty.
/// Sums left to right, so equal sequences always give the same float.
pub fn mean(delays: impl IntoIterator<Item = Delay>) -> Option<Delay> {
    let mut sum = Delay::minutes(0.0);
    let mut count = 0usize;
    for delay in delays {
        sum += delay;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod test {
    use super::{mean, Delay, Punctuality};

    #[test]
    fn mean_of_nothing_is_undefined() {
        assert_eq!(mean(vec![]), None);
    }

    #[test]
    fn mean_of_delays() {
        assert_eq!(
            mean(vec![Delay::minutes(2.0), Delay::minutes(4.0)]),
            Some(Delay::minutes(3.0))
        );
        assert_eq!(mean(vec![Delay::minutes(7.5)]), Some(Delay::minutes(7.5)));
    }

    #[test]
    fn six_minutes_counts_as_delayed() {
        assert_eq!(Delay::minutes(5.9).punctuality(), Punctuality::OnTime);
        assert_eq!(Delay::minutes(6.0).punctuality(), Punctuality::Delayed);
        assert!(!Delay::minutes(0.0).is_delayed());
        assert!(Delay::minutes(17.25).is_delayed());
    }

    #[test]
    fn early_arrivals_are_on_time() {
        // a negative reading means the train ran early
        assert_eq!(Delay::minutes(-2.0).punctuality(), Punctuality::OnTime);
        assert!(!Delay::minutes(-0.5).is_delayed());
        assert_eq!(
            mean(vec![Delay::minutes(-2.0), Delay::minutes(4.0)]),
            Some(Delay::minutes(1.0))
        );
    }

    #[test]
    fn arithmetic() {
        let mut total = Delay::minutes(1.0);
        total += Delay::minutes(2.0);
        assert_eq!(total, Delay::minutes(3.0));
        assert_eq!(total / 2.0, Delay::minutes(1.5));
        let summed: Delay = vec![Delay::minutes(1.0), Delay::minutes(2.5)].into_iter().sum();
        assert_eq!(summed, Delay::minutes(3.5));
    }

    #[test]
    fn display() {
        assert_eq!(Delay::minutes(2.0).to_string(), "2.0 min");
        assert_eq!(Delay::minutes(7.5).to_string(), "7.5 min");
        assert_eq!(Punctuality::OnTime.to_string(), "on time");
        assert_eq!(Punctuality::Delayed.to_string(), "delayed");
    }
}
