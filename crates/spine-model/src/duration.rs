use std::fmt;
use std::time::Duration;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// `xs:duration` value with whole-second resolution, as carried by the
/// heartbeat payload ("PT4S").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XsDuration(Duration);

impl XsDuration {
    pub fn from_duration(duration: Duration) -> Self {
        Self(Duration::from_secs(duration.as_secs()))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let rest = text
            .strip_prefix('P')
            .ok_or_else(|| format!("duration '{text}' does not start with 'P'"))?;
        let (days_part, time_part) = match rest.split_once('T') {
            Some((days, time)) => (days, Some(time)),
            None => (rest, None),
        };

        let mut secs: u64 = 0;
        if !days_part.is_empty() {
            let days = days_part
                .strip_suffix('D')
                .and_then(|n| n.parse::<u64>().ok())
                .ok_or_else(|| format!("invalid day component in '{text}'"))?;
            secs += days * 86_400;
        }

        if let Some(time) = time_part {
            let mut number = String::new();
            for c in time.chars() {
                if c.is_ascii_digit() {
                    number.push(c);
                    continue;
                }
                let value = number
                    .parse::<u64>()
                    .map_err(|_| format!("invalid time component in '{text}'"))?;
                number.clear();
                match c {
                    'H' => secs += value * 3_600,
                    'M' => secs += value * 60,
                    'S' => secs += value,
                    _ => return Err(format!("unknown designator '{c}' in '{text}'")),
                }
            }
            if !number.is_empty() {
                return Err(format!("trailing digits without designator in '{text}'"));
            }
        }

        Ok(Self(Duration::from_secs(secs)))
    }
}

impl fmt::Display for XsDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut secs = self.0.as_secs();
        if secs == 0 {
            return f.write_str("PT0S");
        }
        f.write_str("P")?;
        let days = secs / 86_400;
        if days > 0 {
            write!(f, "{days}D")?;
            secs %= 86_400;
        }
        if secs > 0 {
            f.write_str("T")?;
            let hours = secs / 3_600;
            if hours > 0 {
                write!(f, "{hours}H")?;
            }
            let minutes = (secs % 3_600) / 60;
            if minutes > 0 {
                write!(f, "{minutes}M")?;
            }
            let seconds = secs % 60;
            if seconds > 0 {
                write!(f, "{seconds}S")?;
            }
        }
        Ok(())
    }
}

impl Serialize for XsDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for XsDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        XsDuration::parse(&text).map_err(de::Error::custom)
    }
}
