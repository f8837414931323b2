//! Centroid gazetteer: the default `LocationResolver`.
//!
//! Ships with the 47 Japanese prefectural office locations plus the
//! designated cities and other major municipalities, and accepts extra
//! prefecture- or municipality-level entries from a JSON file. Municipality
//! entries win over the prefecture centroid when both exist.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::address::AddressParts;
use super::resolver::{Located, LocationResolver, Precision};
use crate::config::ConfigError;
use crate::error::{LookupFailure, Result, TriageError};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle (haversine) distance in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

pub(crate) struct PrefectureCentroid {
    pub name: &'static str,
    pub point: GeoPoint,
}

const fn centroid(name: &'static str, lat: f64, lon: f64) -> PrefectureCentroid {
    PrefectureCentroid {
        name,
        point: GeoPoint::new(lat, lon),
    }
}

/// Prefectural office coordinates.
pub(crate) const PREFECTURE_CENTROIDS: &[PrefectureCentroid] = &[
    centroid("北海道", 43.064, 141.347),
    centroid("青森県", 40.824, 140.740),
    centroid("岩手県", 39.704, 141.153),
    centroid("宮城県", 38.269, 140.872),
    centroid("秋田県", 39.719, 140.102),
    centroid("山形県", 38.240, 140.364),
    centroid("福島県", 37.750, 140.468),
    centroid("茨城県", 36.342, 140.447),
    centroid("栃木県", 36.566, 139.884),
    centroid("群馬県", 36.391, 139.061),
    centroid("埼玉県", 35.857, 139.649),
    centroid("千葉県", 35.605, 140.123),
    centroid("東京都", 35.690, 139.692),
    centroid("神奈川県", 35.448, 139.643),
    centroid("新潟県", 37.902, 139.023),
    centroid("富山県", 36.695, 137.211),
    centroid("石川県", 36.595, 136.626),
    centroid("福井県", 36.065, 136.222),
    centroid("山梨県", 35.664, 138.568),
    centroid("長野県", 36.651, 138.181),
    centroid("岐阜県", 35.391, 136.722),
    centroid("静岡県", 34.977, 138.383),
    centroid("愛知県", 35.180, 136.907),
    centroid("三重県", 34.730, 136.509),
    centroid("滋賀県", 35.004, 135.868),
    centroid("京都府", 35.021, 135.756),
    centroid("大阪府", 34.686, 135.520),
    centroid("兵庫県", 34.691, 135.183),
    centroid("奈良県", 34.685, 135.833),
    centroid("和歌山県", 34.226, 135.167),
    centroid("鳥取県", 35.504, 134.238),
    centroid("島根県", 35.472, 133.051),
    centroid("岡山県", 34.662, 133.935),
    centroid("広島県", 34.397, 132.460),
    centroid("山口県", 34.186, 131.471),
    centroid("徳島県", 34.066, 134.559),
    centroid("香川県", 34.340, 134.043),
    centroid("愛媛県", 33.842, 132.766),
    centroid("高知県", 33.560, 133.531),
    centroid("福岡県", 33.607, 130.418),
    centroid("佐賀県", 33.249, 130.299),
    centroid("長崎県", 32.745, 129.874),
    centroid("熊本県", 32.790, 130.742),
    centroid("大分県", 33.238, 131.613),
    centroid("宮崎県", 31.911, 131.424),
    centroid("鹿児島県", 31.560, 130.558),
    centroid("沖縄県", 26.212, 127.681),
];

pub(crate) struct MunicipalityCentroid {
    pub prefecture: &'static str,
    pub name: &'static str,
    pub point: GeoPoint,
}

const fn municipality(
    prefecture: &'static str,
    name: &'static str,
    lat: f64,
    lon: f64,
) -> MunicipalityCentroid {
    MunicipalityCentroid {
        prefecture,
        name,
        point: GeoPoint::new(lat, lon),
    }
}

/// City hall coordinates for the designated cities and other municipalities
/// far from their prefectural office.
pub(crate) const MUNICIPALITY_CENTROIDS: &[MunicipalityCentroid] = &[
    municipality("北海道", "札幌市", 43.062, 141.354),
    municipality("北海道", "函館市", 41.769, 140.729),
    municipality("北海道", "旭川市", 43.771, 142.365),
    municipality("北海道", "釧路市", 42.985, 144.381),
    municipality("北海道", "帯広市", 42.924, 143.196),
    municipality("北海道", "北見市", 43.807, 143.894),
    municipality("北海道", "稚内市", 45.416, 141.673),
    municipality("青森県", "八戸市", 40.512, 141.488),
    municipality("岩手県", "盛岡市", 39.702, 141.154),
    municipality("岩手県", "宮古市", 39.641, 141.957),
    municipality("岩手県", "陸前高田市", 39.015, 141.630),
    municipality("宮城県", "仙台市", 38.268, 140.870),
    municipality("宮城県", "石巻市", 38.434, 141.303),
    municipality("宮城県", "牡鹿郡", 38.445, 141.441),
    municipality("宮城県", "気仙沼市", 38.908, 141.570),
    municipality("福島県", "福島市", 37.761, 140.474),
    municipality("福島県", "郡山市", 37.400, 140.360),
    municipality("福島県", "いわき市", 37.050, 140.888),
    municipality("福島県", "会津若松市", 37.495, 139.930),
    municipality("埼玉県", "さいたま市", 35.861, 139.646),
    municipality("千葉県", "千葉市", 35.607, 140.106),
    municipality("神奈川県", "横浜市", 35.444, 139.638),
    municipality("神奈川県", "川崎市", 35.531, 139.703),
    municipality("神奈川県", "相模原市", 35.571, 139.373),
    municipality("新潟県", "新潟市", 37.916, 139.036),
    municipality("新潟県", "上越市", 37.148, 138.236),
    municipality("静岡県", "静岡市", 34.975, 138.383),
    municipality("静岡県", "浜松市", 34.711, 137.726),
    municipality("愛知県", "名古屋市", 35.181, 136.906),
    municipality("京都府", "京都市", 35.012, 135.768),
    municipality("大阪府", "大阪市", 34.694, 135.502),
    municipality("大阪府", "堺市", 34.573, 135.483),
    municipality("兵庫県", "神戸市", 34.690, 135.196),
    municipality("岡山県", "岡山市", 34.655, 133.919),
    municipality("広島県", "広島市", 34.385, 132.455),
    municipality("福岡県", "北九州市", 33.883, 130.875),
    municipality("福岡県", "福岡市", 33.590, 130.402),
    municipality("熊本県", "熊本市", 32.803, 130.708),
    municipality("鹿児島県", "奄美市", 28.377, 129.494),
    municipality("沖縄県", "石垣市", 24.341, 124.156),
];

/// One gazetteer row as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub prefecture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// Lookup table from administrative units to coordinates.
#[derive(Clone, Debug, Default)]
pub struct Gazetteer {
    entries: HashMap<AddressParts, GeoPoint>,
}

impl Gazetteer {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in prefecture and municipality table.
    pub fn builtin() -> Self {
        let mut gazetteer = Self::new();
        for prefecture in PREFECTURE_CENTROIDS {
            gazetteer
                .entries
                .insert(AddressParts::new(prefecture.name, None), prefecture.point);
        }
        for city in MUNICIPALITY_CENTROIDS {
            gazetteer.entries.insert(
                AddressParts::new(city.prefecture, Some(city.name.to_string())),
                city.point,
            );
        }
        gazetteer
    }

    pub fn insert(&mut self, entry: GazetteerEntry) {
        let key = AddressParts::new(entry.prefecture, entry.municipality);
        self.entries.insert(key, GeoPoint::new(entry.lat, entry.lon));
    }

    pub fn with_entries(mut self, entries: impl IntoIterator<Item = GazetteerEntry>) -> Self {
        for entry in entries {
            self.insert(entry);
        }
        self
    }

    /// Read gazetteer rows from a JSON array file.
    ///
    /// # Errors
    ///
    /// I/O and decode errors, or a `ConfigError::ValidationError` naming the
    /// first row with out-of-range coordinates.
    pub fn load_entries(path: &Path) -> Result<Vec<GazetteerEntry>> {
        let raw = std::fs::read_to_string(path).map_err(|source| TriageError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<GazetteerEntry> =
            serde_json::from_str(&raw).map_err(|source| TriageError::JsonDeserialize {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(bad) = entries
            .iter()
            .find(|e| !GeoPoint::new(e.lat, e.lon).is_valid())
        {
            return Err(TriageError::Config(ConfigError::ValidationError(format!(
                "gazetteer entry '{}' has out-of-range coordinates ({}, {})",
                bad.prefecture, bad.lat, bad.lon
            ))));
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded gazetteer file");
        Ok(entries)
    }

    /// Municipality entry first, then the prefecture centroid.
    pub fn lookup(&self, parts: &AddressParts) -> Option<Located> {
        if parts.municipality.is_some()
            && let Some(point) = self.entries.get(parts)
        {
            return Some(Located::new(*point, Precision::Municipality));
        }
        self.entries
            .get(&AddressParts::new(parts.prefecture.clone(), None))
            .map(|point| Located::new(*point, Precision::Prefecture))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LocationResolver for Gazetteer {
    async fn locate(&self, address: &AddressParts) -> std::result::Result<Located, LookupFailure> {
        self.lookup(address).ok_or_else(|| LookupFailure::Unresolved {
            location: match &address.municipality {
                Some(m) => format!("{}{m}", address.prefecture),
                None => address.prefecture.clone(),
            },
        })
    }

    fn name(&self) -> &str {
        "gazetteer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn haversine_matches_known_distance() {
        // Tokyo to Sendai is roughly 300 km in a straight line.
        let tokyo = GeoPoint::new(35.690, 139.692);
        let sendai = GeoPoint::new(38.269, 140.872);
        let km = tokyo.distance_km(&sendai);
        assert!((km - 305.0).abs() < 15.0, "got {km}");
        assert_eq!(tokyo.distance_km(&tokyo), 0.0);
    }

    #[test]
    fn builtin_covers_every_prefecture() {
        let gazetteer = Gazetteer::builtin();
        assert_eq!(PREFECTURE_CENTROIDS.len(), 47);
        assert_eq!(
            gazetteer.len(),
            PREFECTURE_CENTROIDS.len() + MUNICIPALITY_CENTROIDS.len()
        );
        assert!(PREFECTURE_CENTROIDS.iter().all(|p| p.point.is_valid()));
    }

    #[test]
    fn builtin_municipalities_sit_in_known_prefectures() {
        for city in MUNICIPALITY_CENTROIDS {
            assert!(city.point.is_valid(), "{}", city.name);
            assert!(
                PREFECTURE_CENTROIDS.iter().any(|p| p.name == city.prefecture),
                "{}{}",
                city.prefecture,
                city.name
            );
        }
    }

    #[test]
    fn hokkaido_cities_resolve_individually() {
        let gazetteer = Gazetteer::builtin();
        let kushiro = gazetteer
            .lookup(&AddressParts::new("北海道", Some("釧路市".into())))
            .expect("kushiro");
        let hakodate = gazetteer
            .lookup(&AddressParts::new("北海道", Some("函館市".into())))
            .expect("hakodate");
        assert_eq!(kushiro.precision, Precision::Municipality);
        assert_eq!(hakodate.precision, Precision::Municipality);
        let km = kushiro.point.distance_km(&hakodate.point);
        assert!(km > 200.0, "got {km}");
    }

    #[test]
    fn municipality_entry_overrides_prefecture() {
        let gazetteer = Gazetteer::builtin().with_entries([GazetteerEntry {
            prefecture: "宮城県".into(),
            municipality: Some("石巻市".into()),
            lat: 38.430,
            lon: 141.300,
        }]);

        let ishinomaki = AddressParts::new("宮城県", Some("石巻市".into()));
        let natori = AddressParts::new("宮城県", Some("名取市".into()));
        assert_eq!(
            gazetteer.lookup(&ishinomaki),
            Some(Located::new(
                GeoPoint::new(38.430, 141.300),
                Precision::Municipality
            ))
        );
        assert_eq!(
            gazetteer.lookup(&natori),
            Some(Located::new(
                GeoPoint::new(38.269, 140.872),
                Precision::Prefecture
            ))
        );
    }

    #[tokio::test]
    async fn unknown_prefecture_is_unresolved() {
        let gazetteer = Gazetteer::builtin();
        let err = gazetteer
            .locate(&AddressParts::new("Atlantis", None))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LookupFailure::Unresolved {
                location: "Atlantis".into()
            }
        );
    }

    #[test]
    fn load_entries_rejects_bad_coordinates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gazetteer.json");
        std::fs::write(
            &path,
            r#"[{"prefecture": "CityA", "lat": 95.0, "lon": 10.0}]"#,
        )
        .expect("write");

        let err = Gazetteer::load_entries(&path).unwrap_err();
        assert!(matches!(err, TriageError::Config(ConfigError::ValidationError(_))));
    }

    #[test]
    fn load_entries_reads_json_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gazetteer.json");
        std::fs::write(
            &path,
            r#"[
                {"prefecture": "CityA", "municipality": "CityA-ward", "lat": 35.0, "lon": 139.0},
                {"prefecture": "CityB", "lat": 35.8, "lon": 139.0}
            ]"#,
        )
        .expect("write");

        let entries = Gazetteer::load_entries(&path).expect("load");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].municipality, None);
    }
}
