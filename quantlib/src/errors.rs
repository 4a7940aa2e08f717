use chrono::NaiveDate;

#[derive(Debug)]
pub enum QuantError {
    // No price rows exist for the ticker inside the requested window
    DataUnavailable {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    InvalidWeightVector(String),
    MalformedSeries(String),
    NonFiniteObjective(Vec<f64>),
    SurrogateFailure(String),
    InvalidSettings(String),
    Logging(String),
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for QuantError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            QuantError::DataUnavailable { ticker, start, end } => write!(
                f,
                "DataUnavailable: no price data for {} between {} and {}",
                ticker, start, end
            ),
            QuantError::InvalidWeightVector(message) => {
                write!(f, "InvalidWeightVector: {}", message)
            }
            QuantError::MalformedSeries(message) => write!(f, "MalformedSeries: {}", message),
            QuantError::NonFiniteObjective(x) => {
                write!(f, "NonFiniteObjective: objective is not finite at {:?}", x)
            }
            QuantError::SurrogateFailure(message) => write!(f, "SurrogateFailure: {}", message),
            QuantError::InvalidSettings(message) => write!(f, "InvalidSettings: {}", message),
            QuantError::Logging(message) => write!(f, "Logging: {}", message),
            QuantError::Io(e) => write!(f, "Io: {}", e),
            QuantError::Csv(e) => write!(f, "Csv: {}", e),
            QuantError::Json(e) => write!(f, "Json: {}", e),
        }
    }
}

impl std::error::Error for QuantError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuantError::Io(e) => Some(e),
            QuantError::Csv(e) => Some(e),
            QuantError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for QuantError {
    fn from(e: std::io::Error) -> Self {
        QuantError::Io(e)
    }
}

impl From<csv::Error> for QuantError {
    fn from(e: csv::Error) -> Self {
        QuantError::Csv(e)
    }
}

impl From<serde_json::Error> for QuantError {
    fn from(e: serde_json::Error) -> Self {
        QuantError::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_unavailable_names_ticker_and_window() {
        let e = QuantError::DataUnavailable {
            ticker: "SPY".to_string(),
            start: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2002, 1, 1).unwrap(),
        };
        let message = e.to_string();
        assert!(message.contains("SPY"));
        assert!(message.contains("2001-01-01"));
        assert!(message.contains("2002-01-01"));
    }

    #[test]
    fn io_errors_keep_their_source() {
        let e: QuantError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(std::error::Error::source(&e).is_some());
    }
}
