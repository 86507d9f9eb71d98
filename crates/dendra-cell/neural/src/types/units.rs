// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unit conversions used when turning geometric/electrical densities into
//! per-compartment quantities.
//!
//! ```text
//! voltage      mV      time         ms
//! conductance  nS      current      pA
//! capacitance  pF      resistance   MΩ
//! length       µm
//!
//! nS · mV = pA        pF · mV / ms = pA
//! ```

use core::f64::consts::PI;

/// 1 µm² expressed in cm²
pub const UM2_TO_CM2: f64 = 1e-8;

/// µF/cm² × cm² = µF; µF → pF
const UF_TO_PF: f64 = 1e6;

/// S/cm² × cm² = S; S → nS
const S_TO_NS: f64 = 1e9;

/// Lateral membrane area of a cylinder (µm²)
#[inline]
pub fn cylinder_area_um2(length_um: f64, diameter_um: f64) -> f64 {
    PI * diameter_um * length_um
}

/// Capacitance (pF) of an area (µm²) with specific capacitance in µF/cm²
#[inline]
pub fn capacitance_pf(cm_uf_per_cm2: f64, area_um2: f64) -> f64 {
    cm_uf_per_cm2 * area_um2 * UM2_TO_CM2 * UF_TO_PF
}

/// Conductance (nS) of an area (µm²) with conductance density in S/cm²
#[inline]
pub fn conductance_ns(g_s_per_cm2: f64, area_um2: f64) -> f64 {
    g_s_per_cm2 * area_um2 * UM2_TO_CM2 * S_TO_NS
}

/// Axial resistance (MΩ) of a cylinder from bulk resistivity (Ω·cm)
///
/// `R = ρ · 4 · L / (π · d²)`, with L and d converted from µm to cm
/// (factor 1e4 overall) and Ω converted to MΩ (1e-6).
#[inline]
pub fn axial_resistance_mohm(resistivity_ohm_cm: f64, length_um: f64, diameter_um: f64) -> f64 {
    resistivity_ohm_cm * 4.0 * length_um / (PI * diameter_um * diameter_um) * 1e-2
}

/// Conductance (nS) of a resistance given in MΩ
#[inline]
pub fn mohm_to_ns(resistance_mohm: f64) -> f64 {
    1e3 / resistance_mohm
}
