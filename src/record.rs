use serde::{Deserialize, Serialize};

/// Every positional record of the published dataset is on this planet
const EARTH: &str = "Earth";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planet: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Payload {
    Positional(Vec<Option<Scalar>>),
    Named(GeoRecord),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Text(String),
    Number(f64),
}

impl Scalar {
    /// Empty strings and zeros mark a missing value in positional records
    fn is_present(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty(),
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
        }
    }

    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.trim().parse().ok(),
            Self::Number(n) => Some(*n),
        }
    }
}

impl From<Vec<Option<Scalar>>> for GeoRecord {
    fn from(fields: Vec<Option<Scalar>>) -> Self {
        let mut fields = fields
            .into_iter()
            .map(|field| field.filter(Scalar::is_present));
        let mut next = || fields.next().flatten();
        Self {
            country_name: next().map(Scalar::into_text),
            country_code: next().map(Scalar::into_text),
            region_code: next().map(Scalar::into_text),
            city: next().map(Scalar::into_text),
            postal_code: next().map(Scalar::into_text),
            latitude: next().as_ref().and_then(Scalar::to_f64),
            longitude: next().as_ref().and_then(Scalar::to_f64),
            metro_code: next().map(Scalar::into_text),
            area_code: next().map(Scalar::into_text),
            planet: Some(EARTH.to_owned()),
        }
    }
}

impl From<Payload> for GeoRecord {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Positional(fields) => fields.into(),
            Payload::Named(record) => record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> GeoRecord {
        serde_json::from_value::<Payload>(value).unwrap().into()
    }

    #[test]
    fn positional_ashburn() {
        let record = payload(json!([
            "USA", "US", "VA", "Ashburn", "20103", "39.0019", "-77.4556", "", ""
        ]));
        assert_eq!(
            record,
            GeoRecord {
                country_name: Some("USA".into()),
                country_code: Some("US".into()),
                region_code: Some("VA".into()),
                city: Some("Ashburn".into()),
                postal_code: Some("20103".into()),
                latitude: Some(39.0019),
                longitude: Some(-77.4556),
                planet: Some("Earth".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn positional_sparse() {
        let record = payload(json!(["Australia", "AU", null, "", 0, -27, 133.0]));
        assert_eq!(record.country_name.as_deref(), Some("Australia"));
        assert_eq!(record.region_code, None);
        assert_eq!(record.city, None);
        assert_eq!(record.postal_code, None);
        assert_eq!(record.latitude, Some(-27.0));
        assert_eq!(record.longitude, Some(133.0));
        assert_eq!(record.metro_code, None);
        assert_eq!(record.planet.as_deref(), Some("Earth"));
    }

    #[test]
    fn positional_empty() {
        let record = payload(json!([]));
        assert_eq!(
            record,
            GeoRecord {
                planet: Some("Earth".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn named_passthrough() {
        let record = payload(json!({"country_code": "NZ", "city": "Wellington", "latitude": -41.29}));
        assert_eq!(record.country_code.as_deref(), Some("NZ"));
        assert_eq!(record.city.as_deref(), Some("Wellington"));
        assert_eq!(record.latitude, Some(-41.29));
        assert_eq!(record.planet, None);
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let record = GeoRecord {
            city: Some("Ashburn".into()),
            latitude: Some(39.0019),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"city": "Ashburn", "latitude": 39.0019})
        );
    }
}
