//! Milk energy target

/// Target milk net energy, Mcal/kg, from milk fat, true protein and lactose (%).
///
/// Falls back to the fat-only equation when the three-component result is NaN,
/// which happens when any component is NaN.
pub fn target_milk_net_energy(fat_pct: f64, true_protein_pct: f64, lactose_pct: f64) -> f64 {
    let energy = 9.29 * fat_pct / 100.0 + 5.85 * true_protein_pct / 100.0 + 3.95 * lactose_pct / 100.0;
    if energy.is_nan() {
        0.36 + 9.69 * fat_pct / 100.0
    } else {
        energy
    }
}

/// Target milk net energy output, Mcal/d
pub fn target_milk_net_energy_output(milk_kg: f64, net_energy_per_kg: f64) -> f64 {
    milk_kg * net_energy_per_kg
}
