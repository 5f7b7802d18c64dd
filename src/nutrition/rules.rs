//! Standard component rules
//!
//! Percentages in the feed library are % of DM (or of CP, of NDF, of FA where
//! noted). Rules return fractions in their declared basis: a feed with 18 % CP
//! has a crude protein value of 0.18. The catalog does the scaling to kg/d.

use crate::models::{
    ComponentResult, FeedCategory, FeedComposition, IntakeRow, NdfDigestibilitySource, UnitBasis,
    A_FRACTION_ESCAPE, FAT_DIGESTIBILITY_BASE, FA_DIGESTIBILITY_BASE, KP_CONCENTRATE, KP_FORAGE,
    REFERENCE_CP_INTAKE, ROM_DIGESTIBILITY, RUP_INTERCEPT,
};

use super::catalog::{ComponentRule, RowContext};
use super::{IntakeError, IntakeResult};

// Component names
pub const CRUDE_PROTEIN: &str = "crude_protein";
pub const RUP_BASE: &str = "rup_base";
pub const NDF: &str = "ndf";
pub const ADF: &str = "adf";
pub const STARCH: &str = "starch";
pub const CRUDE_FAT: &str = "crude_fat";
pub const ASH: &str = "ash";
pub const DIGESTIBLE_NDF: &str = "digestible_ndf";
pub const DIGESTIBLE_STARCH: &str = "digestible_starch";
pub const DIGESTIBLE_ROM: &str = "digestible_rom";
pub const DIGESTED_RUP: &str = "digested_rup";
pub const DIGESTED_FA: &str = "digested_fa";
pub const WET_FORAGE: &str = "wet_forage";
pub const FORAGE_NDF: &str = "forage_ndf";
pub const FATTY_ACIDS: &str = "fatty_acids";
pub const DIGESTED_C160: &str = "digested_c160";
pub const DIGESTED_C183: &str = "digested_c183";

// Auxiliary row quantities
pub const RUP_BASE_PCT_CP: &str = "rup_base_pct_cp";
pub const NDF_INTAKE_KG: &str = "ndf_intake_kg";
pub const NDF_DIGESTIBILITY_BASE: &str = "ndf_digestibility_base";
pub const CP_INTAKE_KG: &str = "cp_intake_kg";
pub const CP_A_INTAKE_KG: &str = "cp_a_intake_kg";
pub const CP_B_INTAKE_KG: &str = "cp_b_intake_kg";
pub const CP_C_INTAKE_KG: &str = "cp_c_intake_kg";
pub const NPN_CP_INTAKE_KG: &str = "npn_cp_intake_kg";
pub const RUP_B_INTAKE_KG: &str = "rup_b_intake_kg";
pub const RUP_INTAKE_KG: &str = "rup_intake_kg";
pub const ROM_PCT: &str = "rom_pct";
pub const FA_DIGESTIBILITY: &str = "fa_digestibility";

/// Substituted for NDF when it is exactly zero in the lignin equation
pub const NDF_EPSILON: f64 = 1e-6;

/// Hydrolysis factor converting FA to triglyceride mass
const FA_HYDROLYSIS: f64 = 1.0 / 1.06;

/// CP to N-equivalent DM for non-protein nitrogen
const NPN_CP_TO_DM: f64 = 2.81;

/// The standard catalog, in evaluation order
pub fn standard_rules() -> Vec<Box<dyn ComponentRule>> {
    vec![
        Box::new(PercentOfDm::new(CRUDE_PROTEIN, "Crude Protein", |f| f.crude_protein_pct)),
        Box::new(RupBase),
        Box::new(PercentOfDm::new(NDF, "Neutral Detergent Fiber", |f| f.ndf_pct)),
        Box::new(PercentOfDm::new(ADF, "Acid Detergent Fiber", |f| f.adf_pct)),
        Box::new(PercentOfDm::new(STARCH, "Starch", |f| f.starch_pct)),
        Box::new(PercentOfDm::new(CRUDE_FAT, "Crude Fat", |f| f.crude_fat_pct)),
        Box::new(PercentOfDm::new(ASH, "Ash", |f| f.ash_pct)),
        Box::new(DigestibleNdf),
        Box::new(DigestibleStarch),
        Box::new(DigestibleRom),
        Box::new(DigestedRup),
        Box::new(DigestedFa),
        Box::new(WetForage),
        Box::new(ForageNdf),
        Box::new(FattyAcids),
        Box::new(DigestedFaProfile::new(DIGESTED_C160, "Digested C16:0", |f| f.c160_pct_fa)),
        Box::new(DigestedFaProfile::new(DIGESTED_C183, "Digested C18:3", |f| f.c183_pct_fa)),
    ]
}

/// Fetch a dependency already evaluated for this row
fn dependency<'r>(row: &'r IntakeRow, rule: &str, name: &str) -> IntakeResult<&'r ComponentResult> {
    row.component(name).ok_or_else(|| {
        IntakeError::Catalog(format!("'{}' evaluated before its dependency '{}'", rule, name))
    })
}

// ============================================================================
// Direct % of DM components
// ============================================================================

/// Composition percentage taken straight from the feed library
pub struct PercentOfDm {
    name: &'static str,
    label: &'static str,
    pick: fn(&FeedComposition) -> f64,
}

impl PercentOfDm {
    pub fn new(name: &'static str, label: &'static str, pick: fn(&FeedComposition) -> f64) -> Self {
        Self { name, label, pick }
    }
}

impl ComponentRule for PercentOfDm {
    fn name(&self) -> &'static str {
        self.name
    }

    fn label(&self) -> &'static str {
        self.label
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::PercentOfDm
    }

    fn evaluate(&self, ctx: &RowContext<'_>, _row: &mut IntakeRow) -> IntakeResult<f64> {
        Ok((self.pick)(ctx.feed) / 100.0)
    }
}

// ============================================================================
// RUP at base intake, % of CP
// ============================================================================

pub struct RupBase;

impl ComponentRule for RupBase {
    fn name(&self) -> &'static str {
        RUP_BASE
    }

    fn label(&self) -> &'static str {
        "Rumen Undegradable Protein"
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::PercentOfCrudeProtein
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[CRUDE_PROTEIN]
    }

    fn evaluate(&self, ctx: &RowContext<'_>, row: &mut IntakeRow) -> IntakeResult<f64> {
        let value = ctx.feed.rup_base_pct_cp / 100.0;
        row.set_quantity(RUP_BASE_PCT_CP, value * ctx.entry.dm_fraction());
        Ok(value)
    }
}

// ============================================================================
// Digestible NDF
// ============================================================================

/// Lignin-based NDF digestibility, % of NDF.
///
/// NDF of exactly zero is replaced by [`NDF_EPSILON`]; with no NDF and no
/// lignin the estimate is 0.
pub fn lignin_ndf_digestibility(ndf_pct: f64, lignin_pct: f64) -> f64 {
    let ndf_safe = if ndf_pct == 0.0 { NDF_EPSILON } else { ndf_pct };
    0.75 * (ndf_pct - lignin_pct) * (1.0 - (lignin_pct / ndf_safe).powf(0.667)) / ndf_safe * 100.0
}

/// 48 h in-vitro based NDF digestibility, % of NDF
pub fn in_vitro_ndf_digestibility(dndf_48h: f64) -> f64 {
    12.0 + 0.61 * dndf_48h
}

/// Base NDF digestibility, % of NDF, under the selected source
pub fn ndf_digestibility_base(feed: &FeedComposition, source: NdfDigestibilitySource) -> f64 {
    match (source, feed.ndf_digestibility_48h) {
        (NdfDigestibilitySource::InVitroForages, Some(dndf)) if feed.concentrate_pct < 100.0 => {
            in_vitro_ndf_digestibility(dndf)
        }
        (NdfDigestibilitySource::InVitroAll, Some(dndf)) => in_vitro_ndf_digestibility(dndf),
        _ => lignin_ndf_digestibility(feed.ndf_pct, feed.lignin_pct),
    }
}

pub struct DigestibleNdf;

impl ComponentRule for DigestibleNdf {
    fn name(&self) -> &'static str {
        DIGESTIBLE_NDF
    }

    fn label(&self) -> &'static str {
        "Digestible NDF Intake"
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::IntakeScaled
    }

    fn evaluate(&self, ctx: &RowContext<'_>, row: &mut IntakeRow) -> IntakeResult<f64> {
        let base = ndf_digestibility_base(ctx.feed, ctx.selection.ndf_digestibility);
        tracing::debug!(
            feedstuff = %ctx.entry.feedstuff,
            source = ?ctx.selection.ndf_digestibility,
            in_vitro = ctx.feed.ndf_digestibility_48h.is_some(),
            base,
            "NDF digestibility"
        );

        let ndf = ctx.feed.ndf_pct / 100.0;
        row.set_quantity(NDF_INTAKE_KG, ndf * ctx.entry.intake_kg);
        row.set_quantity(NDF_DIGESTIBILITY_BASE, base);

        Ok(base / 100.0 * ndf)
    }
}

// ============================================================================
// Digestible starch
// ============================================================================

pub struct DigestibleStarch;

impl ComponentRule for DigestibleStarch {
    fn name(&self) -> &'static str {
        DIGESTIBLE_STARCH
    }

    fn label(&self) -> &'static str {
        "Digestible Starch Intake"
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::IntakeScaled
    }

    fn evaluate(&self, ctx: &RowContext<'_>, _row: &mut IntakeRow) -> IntakeResult<f64> {
        let digestible_pct = ctx.feed.starch_pct * ctx.feed.starch_digestibility_pct / 100.0;
        Ok(digestible_pct / 100.0)
    }
}

// ============================================================================
// Digestible residual organic matter
// ============================================================================

/// Residual organic matter, % of DM
pub fn residual_organic_matter(feed: &FeedComposition) -> f64 {
    let hydrolysis = match feed.category {
        FeedCategory::FattyAcidSupplement => 1.0,
        _ => FA_HYDROLYSIS,
    };
    let npn_cp = feed.crude_protein_pct * feed.npn_pct_cp / 100.0;
    let true_protein = feed.crude_protein_pct - npn_cp;
    let npn_dm = npn_cp / NPN_CP_TO_DM;

    100.0
        - feed.ash_pct
        - feed.ndf_pct
        - feed.starch_pct
        - feed.fatty_acid_pct * hydrolysis
        - true_protein
        - npn_dm
}

pub struct DigestibleRom;

impl ComponentRule for DigestibleRom {
    fn name(&self) -> &'static str {
        DIGESTIBLE_ROM
    }

    fn label(&self) -> &'static str {
        "Digestible Residual Organic Matter Intake"
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::IntakeScaled
    }

    fn required_coefficients(&self) -> &'static [&'static str] {
        &[ROM_DIGESTIBILITY]
    }

    fn evaluate(&self, ctx: &RowContext<'_>, row: &mut IntakeRow) -> IntakeResult<f64> {
        let digestibility = ctx.coefficient(ROM_DIGESTIBILITY)?;
        let rom = residual_organic_matter(ctx.feed);
        row.set_quantity(ROM_PCT, rom);

        let digestible_pct = digestibility / 100.0 * rom;
        Ok(digestible_pct / 100.0)
    }
}

// ============================================================================
// Digested RUP, passage-rate kinetics
// ============================================================================

/// Protein flows for one CP intake, kg/d
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RupFlow {
    pub cp: f64,
    pub cp_a: f64,
    pub cp_b: f64,
    pub cp_c: f64,
    pub npn_cp: f64,
    pub rup_b: f64,
    pub rup: f64,
    pub digested: f64,
}

/// Rumen-undegradable protein flow for a given CP intake
pub fn rup_flow(ctx: &RowContext<'_>, cp_intake: f64) -> IntakeResult<RupFlow> {
    let feed = ctx.feed;
    let kp_forage = ctx.coefficient(KP_FORAGE)?;
    let kp_concentrate = ctx.coefficient(KP_CONCENTRATE)?;
    let a_escape = ctx.coefficient(A_FRACTION_ESCAPE)?;
    let intercept = ctx.coefficient(RUP_INTERCEPT)?;
    let reference_cp = ctx.coefficient(REFERENCE_CP_INTAKE)?;

    let cp_a = cp_intake * feed.protein_a_pct_cp / 100.0;
    let cp_b = cp_intake * feed.protein_b_pct_cp / 100.0;
    let cp_c = cp_intake * feed.protein_c_pct_cp / 100.0;
    let npn_cp = cp_intake * feed.npn_pct_cp / 100.0;

    let forage_escape = ctx.divide(DIGESTED_RUP, kp_forage, feed.kd_rup + kp_forage, "Kd + KpFor")?;
    let concentrate_escape =
        ctx.divide(DIGESTED_RUP, kp_concentrate, feed.kd_rup + kp_concentrate, "Kd + KpConc")?;

    let rup_b = cp_b * feed.forage_pct() / 100.0 * forage_escape
        + cp_b * feed.concentrate_pct / 100.0 * concentrate_escape;

    let intercept_share = ctx.divide(DIGESTED_RUP, intercept, reference_cp, REFERENCE_CP_INTAKE)?;
    let rup = (cp_a - npn_cp) * a_escape + rup_b + cp_c + intercept_share * cp_intake;

    Ok(RupFlow {
        cp: cp_intake,
        cp_a,
        cp_b,
        cp_c,
        npn_cp,
        rup_b,
        rup,
        digested: feed.rup_digestibility_pct / 100.0 * rup,
    })
}

pub struct DigestedRup;

impl ComponentRule for DigestedRup {
    fn name(&self) -> &'static str {
        DIGESTED_RUP
    }

    fn label(&self) -> &'static str {
        "Digested RUP"
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::IntakeScaled
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[CRUDE_PROTEIN]
    }

    fn required_coefficients(&self) -> &'static [&'static str] {
        &[A_FRACTION_ESCAPE, KP_FORAGE, KP_CONCENTRATE, RUP_INTERCEPT, REFERENCE_CP_INTAKE]
    }

    fn evaluate(&self, ctx: &RowContext<'_>, row: &mut IntakeRow) -> IntakeResult<f64> {
        let crude_protein = dependency(row, DIGESTED_RUP, CRUDE_PROTEIN)?.value;

        let flow = rup_flow(ctx, crude_protein * ctx.entry.intake_kg)?;
        row.set_quantity(CP_INTAKE_KG, flow.cp);
        row.set_quantity(CP_A_INTAKE_KG, flow.cp_a);
        row.set_quantity(CP_B_INTAKE_KG, flow.cp_b);
        row.set_quantity(CP_C_INTAKE_KG, flow.cp_c);
        row.set_quantity(NPN_CP_INTAKE_KG, flow.npn_cp);
        row.set_quantity(RUP_B_INTAKE_KG, flow.rup_b);
        row.set_quantity(RUP_INTAKE_KG, flow.rup);

        // Every flow is linear in CP intake, so one kg of feed DM gives the concentration
        Ok(rup_flow(ctx, crude_protein)?.digested)
    }
}

// ============================================================================
// Fatty acids
// ============================================================================

/// Total-tract FA digestibility, %; fat supplements use the base coefficients
pub fn fa_digestibility(ctx: &RowContext<'_>) -> IntakeResult<f64> {
    match ctx.feed.category {
        FeedCategory::FattyAcidSupplement => ctx.coefficient(FA_DIGESTIBILITY_BASE),
        FeedCategory::FatSupplement => ctx.coefficient(FAT_DIGESTIBILITY_BASE),
        _ => Ok(ctx.feed.fa_digestibility_pct),
    }
}

pub struct DigestedFa;

impl ComponentRule for DigestedFa {
    fn name(&self) -> &'static str {
        DIGESTED_FA
    }

    fn label(&self) -> &'static str {
        "Digested Fatty Acid Intake"
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::IntakeScaled
    }

    fn required_coefficients(&self) -> &'static [&'static str] {
        &[FA_DIGESTIBILITY_BASE, FAT_DIGESTIBILITY_BASE]
    }

    fn evaluate(&self, ctx: &RowContext<'_>, row: &mut IntakeRow) -> IntakeResult<f64> {
        let digestibility = fa_digestibility(ctx)?;
        row.set_quantity(FA_DIGESTIBILITY, digestibility);
        Ok(digestibility / 100.0 * ctx.feed.fatty_acid_pct / 100.0)
    }
}

pub struct FattyAcids;

impl ComponentRule for FattyAcids {
    fn name(&self) -> &'static str {
        FATTY_ACIDS
    }

    fn label(&self) -> &'static str {
        "Fatty Acid Intake"
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::IntakeScaled
    }

    fn evaluate(&self, ctx: &RowContext<'_>, _row: &mut IntakeRow) -> IntakeResult<f64> {
        Ok(ctx.feed.fatty_acid_pct / 100.0)
    }
}

/// Digested intake of one fatty acid, using the row's FA digestibility
pub struct DigestedFaProfile {
    name: &'static str,
    label: &'static str,
    pick: fn(&FeedComposition) -> f64,
}

impl DigestedFaProfile {
    pub fn new(name: &'static str, label: &'static str, pick: fn(&FeedComposition) -> f64) -> Self {
        Self { name, label, pick }
    }
}

impl ComponentRule for DigestedFaProfile {
    fn name(&self) -> &'static str {
        self.name
    }

    fn label(&self) -> &'static str {
        self.label
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::IntakeScaled
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[DIGESTED_FA]
    }

    fn evaluate(&self, ctx: &RowContext<'_>, row: &mut IntakeRow) -> IntakeResult<f64> {
        dependency(row, self.name, DIGESTED_FA)?;
        let digestibility = row.quantity(FA_DIGESTIBILITY).ok_or_else(|| {
            IntakeError::Catalog(format!("'{}' needs {} from {}", self.name, FA_DIGESTIBILITY, DIGESTED_FA))
        })?;

        let value = digestibility / 100.0 * (self.pick)(ctx.feed) / 100.0 * ctx.feed.fatty_acid_pct / 100.0;
        Ok(value)
    }
}

// ============================================================================
// Forage
// ============================================================================

/// Wet forage share, % of DM: forage-dominant feeds under 71 % DM
pub fn wet_forage_pct(feed: &FeedComposition) -> f64 {
    let forage = feed.forage_pct();
    if forage > 50.0 && feed.dm_pct < 71.0 {
        forage
    } else {
        0.0
    }
}

pub struct WetForage;

impl ComponentRule for WetForage {
    fn name(&self) -> &'static str {
        WET_FORAGE
    }

    fn label(&self) -> &'static str {
        "Wet Forage"
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::IntakeScaled
    }

    fn evaluate(&self, ctx: &RowContext<'_>, _row: &mut IntakeRow) -> IntakeResult<f64> {
        Ok(wet_forage_pct(ctx.feed) / 100.0)
    }
}

pub struct ForageNdf;

impl ComponentRule for ForageNdf {
    fn name(&self) -> &'static str {
        FORAGE_NDF
    }

    fn label(&self) -> &'static str {
        "Forage NDF Intake"
    }

    fn basis(&self) -> UnitBasis {
        UnitBasis::IntakeScaled
    }

    fn evaluate(&self, ctx: &RowContext<'_>, _row: &mut IntakeRow) -> IntakeResult<f64> {
        let forage_ndf = (1.0 - ctx.feed.concentrate_pct / 100.0) * ctx.feed.ndf_pct;
        Ok(forage_ndf / 100.0)
    }
}
