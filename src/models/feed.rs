//! Feed composition model
//!
//! One feed library record: composition of a feedstuff on a dry-matter basis.

use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Feed category tag.
///
/// Only the two fat supplement categories change how a feed is evaluated;
/// everything else is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedCategory {
    FattyAcidSupplement,
    FatSupplement,
    Other(String),
    #[default]
    Unspecified,
}

impl FeedCategory {
    pub fn as_str(&self) -> &str {
        match self {
            FeedCategory::FattyAcidSupplement => "Fatty Acid Supplement",
            FeedCategory::FatSupplement => "Fat Supplement",
            FeedCategory::Other(s) => s.as_str(),
            FeedCategory::Unspecified => "",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim() {
            "Fatty Acid Supplement" => FeedCategory::FattyAcidSupplement,
            "Fat Supplement" => FeedCategory::FatSupplement,
            "" => FeedCategory::Unspecified,
            other => FeedCategory::Other(other.to_string()),
        }
    }
}

impl Serialize for FeedCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FeedCategory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(FeedCategory::from_str(&s))
    }
}

/// Composition of a single feedstuff.
///
/// Field names on the wire (JSON import files, SQLite columns) follow the
/// feed library's `Fd_*` naming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedComposition {
    #[serde(rename = "Fd_Name")]
    pub name: String,
    #[serde(rename = "Fd_Category", default)]
    pub category: FeedCategory,

    #[serde(rename = "Fd_DM", default = "default_dm")]
    pub dm_pct: f64,
    /// Concentrate share of the feed, % of DM; the rest is forage
    #[serde(rename = "Fd_Conc", default)]
    pub concentrate_pct: f64,

    #[serde(rename = "Fd_CP", default)]
    pub crude_protein_pct: f64,
    /// RUP at base intake, % of CP
    #[serde(rename = "Fd_RUP_base", default)]
    pub rup_base_pct_cp: f64,
    #[serde(rename = "Fd_NPN_CP", default)]
    pub npn_pct_cp: f64,
    #[serde(rename = "Fd_CPARU", default)]
    pub protein_a_pct_cp: f64,
    #[serde(rename = "Fd_CPBRU", default)]
    pub protein_b_pct_cp: f64,
    #[serde(rename = "Fd_CPCRU", default)]
    pub protein_c_pct_cp: f64,
    /// Degradation rate of the B fraction, %/h
    #[serde(rename = "Fd_KdRUP", default)]
    pub kd_rup: f64,
    /// Intestinal digestibility of RUP, %
    #[serde(rename = "Fd_dcRUP", default)]
    pub rup_digestibility_pct: f64,

    #[serde(rename = "Fd_NDF", default)]
    pub ndf_pct: f64,
    #[serde(rename = "Fd_ADF", default)]
    pub adf_pct: f64,
    #[serde(rename = "Fd_Lg", default)]
    pub lignin_pct: f64,
    /// 48 h in-vitro NDF digestibility, % of NDF, when measured
    #[serde(rename = "Fd_DNDF48_NDF", default)]
    pub ndf_digestibility_48h: Option<f64>,

    #[serde(rename = "Fd_St", default)]
    pub starch_pct: f64,
    #[serde(rename = "Fd_dcSt", default)]
    pub starch_digestibility_pct: f64,

    #[serde(rename = "Fd_CFat", default)]
    pub crude_fat_pct: f64,
    #[serde(rename = "Fd_FA", default)]
    pub fatty_acid_pct: f64,
    #[serde(rename = "Fd_dcFA", default)]
    pub fa_digestibility_pct: f64,
    #[serde(rename = "Fd_C160_FA", default)]
    pub c160_pct_fa: f64,
    #[serde(rename = "Fd_C183_FA", default)]
    pub c183_pct_fa: f64,

    #[serde(rename = "Fd_Ash", default)]
    pub ash_pct: f64,
}

fn default_dm() -> f64 {
    100.0
}

impl FeedComposition {
    /// Forage share of the feed, % of DM
    pub fn forage_pct(&self) -> f64 {
        100.0 - self.concentrate_pct
    }

    /// Create a FeedComposition from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get::<_, String>("Fd_Name")?.trim().to_string(),
            category: FeedCategory::from_str(&row.get::<_, String>("Fd_Category")?),
            dm_pct: row.get("Fd_DM")?,
            concentrate_pct: row.get("Fd_Conc")?,
            crude_protein_pct: row.get("Fd_CP")?,
            rup_base_pct_cp: row.get("Fd_RUP_base")?,
            npn_pct_cp: row.get("Fd_NPN_CP")?,
            protein_a_pct_cp: row.get("Fd_CPARU")?,
            protein_b_pct_cp: row.get("Fd_CPBRU")?,
            protein_c_pct_cp: row.get("Fd_CPCRU")?,
            kd_rup: row.get("Fd_KdRUP")?,
            rup_digestibility_pct: row.get("Fd_dcRUP")?,
            ndf_pct: row.get("Fd_NDF")?,
            adf_pct: row.get("Fd_ADF")?,
            lignin_pct: row.get("Fd_Lg")?,
            ndf_digestibility_48h: row.get("Fd_DNDF48_NDF")?,
            starch_pct: row.get("Fd_St")?,
            starch_digestibility_pct: row.get("Fd_dcSt")?,
            crude_fat_pct: row.get("Fd_CFat")?,
            fatty_acid_pct: row.get("Fd_FA")?,
            fa_digestibility_pct: row.get("Fd_dcFA")?,
            c160_pct_fa: row.get("Fd_C160_FA")?,
            c183_pct_fa: row.get("Fd_C183_FA")?,
            ash_pct: row.get("Fd_Ash")?,
        })
    }

    /// Insert or replace a feed in the library
    pub fn create(conn: &Connection, data: &FeedComposition) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO feed_library (
                Fd_Name, Fd_Category, Fd_DM, Fd_Conc,
                Fd_CP, Fd_RUP_base, Fd_NPN_CP, Fd_CPARU, Fd_CPBRU, Fd_CPCRU, Fd_KdRUP, Fd_dcRUP,
                Fd_NDF, Fd_ADF, Fd_Lg, Fd_DNDF48_NDF,
                Fd_St, Fd_dcSt,
                Fd_CFat, Fd_FA, Fd_dcFA, Fd_C160_FA, Fd_C183_FA,
                Fd_Ash
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18,
                ?19, ?20, ?21, ?22, ?23,
                ?24
            )
            "#,
            params![
                data.name.trim(),
                data.category.as_str(),
                data.dm_pct,
                data.concentrate_pct,
                data.crude_protein_pct,
                data.rup_base_pct_cp,
                data.npn_pct_cp,
                data.protein_a_pct_cp,
                data.protein_b_pct_cp,
                data.protein_c_pct_cp,
                data.kd_rup,
                data.rup_digestibility_pct,
                data.ndf_pct,
                data.adf_pct,
                data.lignin_pct,
                data.ndf_digestibility_48h,
                data.starch_pct,
                data.starch_digestibility_pct,
                data.crude_fat_pct,
                data.fatty_acid_pct,
                data.fa_digestibility_pct,
                data.c160_pct_fa,
                data.c183_pct_fa,
                data.ash_pct,
            ],
        )?;

        Self::get_by_name(conn, &data.name)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a feed by name
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM feed_library WHERE Fd_Name = ?1")?;

        let result = stmt.query_row([name.trim()], Self::from_row);
        match result {
            Ok(feed) => Ok(Some(feed)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get every listed feed that exists in the library, in one query
    pub fn get_many(conn: &Connection, names: &[&str]) -> DbResult<Vec<Self>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=names.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT * FROM feed_library WHERE Fd_Name IN ({}) ORDER BY Fd_Name",
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let feeds = stmt
            .query_map(params_from_iter(names.iter().map(|n| n.trim())), Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    /// Distinct feed names in the library
    pub fn list_names(conn: &Connection) -> DbResult<Vec<String>> {
        let mut stmt = conn.prepare("SELECT DISTINCT Fd_Name FROM feed_library ORDER BY Fd_Name")?;

        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(names)
    }

    /// Count feeds in the library
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM feed_library", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn corn_silage() -> FeedComposition {
        FeedComposition {
            name: "Corn silage, typical".to_string(),
            category: FeedCategory::Other("Grain Crop Forage".to_string()),
            dm_pct: 35.0,
            concentrate_pct: 40.0,
            crude_protein_pct: 8.8,
            ndf_pct: 39.0,
            lignin_pct: 2.6,
            ndf_digestibility_48h: Some(55.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_category_round_trip_strings() {
        assert_eq!(
            FeedCategory::from_str("Fatty Acid Supplement"),
            FeedCategory::FattyAcidSupplement
        );
        assert_eq!(FeedCategory::from_str(" Fat Supplement "), FeedCategory::FatSupplement);
        assert_eq!(FeedCategory::from_str(""), FeedCategory::Unspecified);
        assert_eq!(FeedCategory::from_str("By-Product/Other").as_str(), "By-Product/Other");
    }

    #[test]
    fn test_create_and_get_by_name() {
        let conn = setup();
        let created = FeedComposition::create(&conn, &corn_silage()).unwrap();
        assert_eq!(created, corn_silage());

        let missing = FeedComposition::get_by_name(&conn, "Alfalfa hay").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_nullable_in_vitro_digestibility() {
        let conn = setup();
        let mut feed = corn_silage();
        feed.ndf_digestibility_48h = None;
        let stored = FeedComposition::create(&conn, &feed).unwrap();
        assert_eq!(stored.ndf_digestibility_48h, None);
    }

    #[test]
    fn test_get_many_and_list_names() {
        let conn = setup();
        FeedComposition::create(&conn, &corn_silage()).unwrap();
        let mut soy = corn_silage();
        soy.name = "Soybean meal".to_string();
        soy.category = FeedCategory::Unspecified;
        FeedComposition::create(&conn, &soy).unwrap();

        let found = FeedComposition::get_many(&conn, &["Soybean meal", "Unknown"]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Soybean meal");

        let names = FeedComposition::list_names(&conn).unwrap();
        assert_eq!(names, vec!["Corn silage, typical", "Soybean meal"]);
        assert_eq!(FeedComposition::count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_deserialize_feed_library_json() {
        let json = r#"{
            "Fd_Name": "Calcium salts of FA",
            "Fd_Category": "Fatty Acid Supplement",
            "Fd_Conc": 100,
            "Fd_FA": 84.5,
            "Fd_dcFA": 0,
            "Fd_DNDF48_NDF": null
        }"#;
        let feed: FeedComposition = serde_json::from_str(json).unwrap();
        assert_eq!(feed.category, FeedCategory::FattyAcidSupplement);
        assert_eq!(feed.dm_pct, 100.0);
        assert_eq!(feed.fatty_acid_pct, 84.5);
        assert_eq!(feed.forage_pct(), 0.0);
        assert!(feed.ndf_digestibility_48h.is_none());
    }
}
