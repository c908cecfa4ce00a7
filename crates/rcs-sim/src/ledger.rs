//! Mass-conservation ledger.
//!
//! [`MassInventory`] owns both the per-component masses and the authoritative
//! primary total. The total changes only in [`MassInventory::apply_boundary_flow`],
//! once per tick, in the same call that moves the matching component masses.
//! Internal transfers move mass between primary components and never touch
//! the total. Audits compare the two and report; they never rewrite either.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// Per-component inventory [lbm].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentMasses {
    pub rcs_water: f64,
    pub pzr_water: f64,
    pub pzr_steam: f64,
    /// Volume control tank (charging source, letdown sink)
    pub vct: f64,
    /// Holdup tank (relief discharge)
    pub holdup: f64,
}

impl ComponentMasses {
    /// RCS + PZR water + PZR steam.
    pub fn primary(&self) -> f64 {
        self.rcs_water + self.pzr_water + self.pzr_steam
    }

    /// Primary plus the external tanks.
    pub fn plant(&self) -> f64 {
        self.primary() + self.vct + self.holdup
    }

    pub fn pzr_total(&self) -> f64 {
        self.pzr_water + self.pzr_steam
    }
}

/// External mass exchanged with the primary this tick [lbm]. All non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryFlow {
    /// VCT → RCS
    pub charging_lbm: f64,
    /// RCS → VCT
    pub letdown_lbm: f64,
    /// RCS water → holdup tank (water-solid relief)
    pub relief_lbm: f64,
    /// PZR steam → holdup tank (relief from the steam space)
    pub steam_relief_lbm: f64,
}

impl BoundaryFlow {
    pub fn net_inflow(&self) -> f64 {
        self.rcs_net_inflow() - self.steam_relief_lbm
    }

    /// Net external flow into the RCS water alone.
    pub fn rcs_net_inflow(&self) -> f64 {
        self.charging_lbm - self.letdown_lbm - self.relief_lbm
    }

    pub fn relief_total(&self) -> f64 {
        self.relief_lbm + self.steam_relief_lbm
    }
}

/// Mass moved between primary components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InternalTransfer {
    /// RCS water → PZR water (negative: outsurge).
    Surge { lbm: f64 },
    /// PZR water → PZR steam (negative: condensation).
    PhaseChange { lbm: f64 },
}

/// What actually happened when a boundary flow was applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedBoundary {
    pub flow: BoundaryFlow,
    /// Some requested amount was limited by the available inventory.
    pub clamped: bool,
}

/// Cumulative external flows since initialisation [lbm].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryAccumulators {
    pub total_in: f64,
    pub total_out: f64,
    pub charging: f64,
    pub letdown: f64,
    pub relief: f64,
}

/// Audit result for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// ledger − Σ primary components
    pub residual: f64,
    /// ledger − (initial + in − out)
    pub independent_residual: f64,
    /// Σ all components − initial plant total
    pub plant_residual: f64,
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassInventory {
    components: ComponentMasses,
    ledger: f64,
    initial_primary: f64,
    initial_plant: f64,
    accumulators: BoundaryAccumulators,
    last_applied_tick: Option<u64>,
}

impl MassInventory {
    pub fn new(components: ComponentMasses) -> SimResult<Self> {
        let all = [
            components.rcs_water,
            components.pzr_water,
            components.pzr_steam,
            components.vct,
            components.holdup,
        ];
        if all.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(SimError::InvalidArg {
                what: "component masses must be finite and non-negative",
            });
        }
        Ok(Self {
            components,
            ledger: components.primary(),
            initial_primary: components.primary(),
            initial_plant: components.plant(),
            accumulators: BoundaryAccumulators::default(),
            last_applied_tick: None,
        })
    }

    pub fn components(&self) -> &ComponentMasses {
        &self.components
    }

    /// Authoritative primary total [lbm].
    pub fn ledger_total(&self) -> f64 {
        self.ledger
    }

    pub fn accumulators(&self) -> &BoundaryAccumulators {
        &self.accumulators
    }

    pub fn last_applied_tick(&self) -> Option<u64> {
        self.last_applied_tick
    }

    /// Apply this tick's external flows to the ledger and the components.
    ///
    /// Charging is limited by the VCT inventory, letdown plus water relief by
    /// the RCS inventory and steam relief by the PZR steam; the ledger
    /// receives exactly what the components received. A second call for the
    /// same tick is rejected.
    pub fn apply_boundary_flow(&mut self, tick: u64, flow: &BoundaryFlow) -> SimResult<AppliedBoundary> {
        if self.last_applied_tick == Some(tick) {
            return Err(SimError::BoundaryAlreadyApplied { tick });
        }
        let requested = [
            flow.charging_lbm,
            flow.letdown_lbm,
            flow.relief_lbm,
            flow.steam_relief_lbm,
        ];
        if requested.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(SimError::InvalidArg {
                what: "boundary flows must be finite and non-negative",
            });
        }

        let mut clamped = false;
        let charging = if flow.charging_lbm > self.components.vct {
            clamped = true;
            self.components.vct
        } else {
            flow.charging_lbm
        };
        let available = self.components.rcs_water + charging;
        let mut letdown = flow.letdown_lbm;
        let mut relief = flow.relief_lbm;
        if letdown + relief > available {
            clamped = true;
            let scale = available / (letdown + relief);
            letdown *= scale;
            relief *= scale;
        }
        let steam_relief = if flow.steam_relief_lbm > self.components.pzr_steam {
            clamped = true;
            self.components.pzr_steam
        } else {
            flow.steam_relief_lbm
        };

        let c = &mut self.components;
        c.vct += letdown - charging;
        c.holdup += relief + steam_relief;
        c.rcs_water += charging - letdown - relief;
        c.pzr_steam -= steam_relief;
        if c.rcs_water < 0.0 {
            // Round-off only; the scale above keeps this at zero.
            c.rcs_water = 0.0;
        }
        let applied = BoundaryFlow {
            charging_lbm: charging,
            letdown_lbm: letdown,
            relief_lbm: relief,
            steam_relief_lbm: steam_relief,
        };
        self.ledger += applied.net_inflow();

        let acc = &mut self.accumulators;
        acc.total_in += charging;
        acc.total_out += letdown + applied.relief_total();
        acc.charging += charging;
        acc.letdown += letdown;
        acc.relief += applied.relief_total();
        self.last_applied_tick = Some(tick);

        Ok(AppliedBoundary {
            flow: applied,
            clamped,
        })
    }

    /// Move mass between primary components. Returns the amount actually
    /// moved and whether it had to be limited to keep the source non-negative.
    pub fn apply_internal(&mut self, transfer: InternalTransfer) -> (f64, bool) {
        let c = &mut self.components;
        match transfer {
            InternalTransfer::Surge { lbm } => {
                let moved = limit_transfer(lbm, c.rcs_water, c.pzr_water);
                c.rcs_water -= moved;
                c.pzr_water += moved;
                (moved, moved != lbm)
            }
            InternalTransfer::PhaseChange { lbm } => {
                let moved = limit_transfer(lbm, c.pzr_water, c.pzr_steam);
                c.pzr_water -= moved;
                c.pzr_steam += moved;
                (moved, moved != lbm)
            }
        }
    }

    /// Compare the ledger against the components and the boundary history.
    pub fn audit(&self, tolerance: f64) -> AuditReport {
        let residual = self.ledger - self.components.primary();
        let independent_residual = self.ledger
            - (self.initial_primary + self.accumulators.total_in - self.accumulators.total_out);
        let plant_residual = self.components.plant() - self.initial_plant;
        let ok = residual.abs() <= tolerance
            && independent_residual.abs() <= tolerance
            && plant_residual.abs() <= tolerance;
        AuditReport {
            residual,
            independent_residual,
            plant_residual,
            ok,
        }
    }
}

/// Positive `lbm` drains `from` into `to`; negative drains `to` into `from`.
fn limit_transfer(lbm: f64, from: f64, to: f64) -> f64 {
    if !lbm.is_finite() {
        return 0.0;
    }
    if lbm >= 0.0 {
        lbm.min(from.max(0.0))
    } else {
        lbm.max(-to.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> MassInventory {
        MassInventory::new(ComponentMasses {
            rcs_water: 700_000.0,
            pzr_water: 110_000.0,
            pzr_steam: 0.0,
            vct: 20_000.0,
            holdup: 0.0,
        })
        .unwrap()
    }

    #[test]
    fn boundary_flow_moves_ledger_and_components_together() {
        let mut inv = inventory();
        let before = inv.ledger_total();
        let flow = BoundaryFlow {
            charging_lbm: 100.0,
            letdown_lbm: 130.0,
            relief_lbm: 5.0,
            ..Default::default()
        };
        let applied = inv.apply_boundary_flow(1, &flow).unwrap();
        assert!(!applied.clamped);
        assert!((inv.ledger_total() - (before - 35.0)).abs() < 1e-9);
        assert!((inv.components().vct - 20_030.0).abs() < 1e-9);
        assert!((inv.components().holdup - 5.0).abs() < 1e-9);
        assert!(inv.audit(1e-6).ok);
    }

    #[test]
    fn steam_relief_leaves_from_the_steam_space() {
        let mut inv = MassInventory::new(ComponentMasses {
            rcs_water: 700_000.0,
            pzr_water: 60_000.0,
            pzr_steam: 900.0,
            vct: 20_000.0,
            holdup: 0.0,
        })
        .unwrap();
        let before = inv.ledger_total();
        let flow = BoundaryFlow {
            charging_lbm: 100.0,
            letdown_lbm: 100.0,
            steam_relief_lbm: 150.0,
            ..Default::default()
        };
        let applied = inv.apply_boundary_flow(1, &flow).unwrap();
        assert!(!applied.clamped);
        let c = inv.components();
        assert_eq!(c.rcs_water, 700_000.0);
        assert!((c.pzr_steam - 750.0).abs() < 1e-9);
        assert!((c.holdup - 150.0).abs() < 1e-9);
        assert!((inv.ledger_total() - (before - 150.0)).abs() < 1e-9);
        assert!((inv.accumulators().relief - 150.0).abs() < 1e-9);
        assert!(inv.audit(1e-6).ok);

        // More than the cushion holds: limited to what is there.
        let applied = inv
            .apply_boundary_flow(
                2,
                &BoundaryFlow {
                    steam_relief_lbm: 5_000.0,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(applied.clamped);
        assert!((applied.flow.steam_relief_lbm - 750.0).abs() < 1e-9);
        assert_eq!(inv.components().pzr_steam, 0.0);
        assert!(inv.audit(1e-6).ok);
    }

    #[test]
    fn second_application_in_same_tick_rejected() {
        let mut inv = inventory();
        let flow = BoundaryFlow::default();
        inv.apply_boundary_flow(7, &flow).unwrap();
        assert_eq!(
            inv.apply_boundary_flow(7, &flow),
            Err(SimError::BoundaryAlreadyApplied { tick: 7 })
        );
        assert!(inv.apply_boundary_flow(8, &flow).is_ok());
    }

    #[test]
    fn internal_transfers_leave_ledger_alone() {
        let mut inv = inventory();
        let before = inv.ledger_total();
        inv.apply_internal(InternalTransfer::Surge { lbm: -500.0 });
        inv.apply_internal(InternalTransfer::PhaseChange { lbm: 40.0 });
        assert_eq!(inv.ledger_total(), before);
        assert!((inv.components().pzr_steam - 40.0).abs() < 1e-12);
        assert!(inv.audit(1e-6).ok);
    }

    #[test]
    fn negative_mass_clamps_transfer() {
        let mut inv = inventory();
        let (moved, clamped) = inv.apply_internal(InternalTransfer::PhaseChange { lbm: -10.0 });
        assert_eq!(moved, 0.0);
        assert!(clamped);
        assert!(inv.components().pzr_steam >= 0.0);
        assert!(inv.audit(1e-6).ok);
    }

    #[test]
    fn charging_limited_by_vct() {
        let mut inv = inventory();
        let flow = BoundaryFlow {
            charging_lbm: 50_000.0,
            ..Default::default()
        };
        let applied = inv.apply_boundary_flow(1, &flow).unwrap();
        assert!(applied.clamped);
        assert_eq!(inv.components().vct, 0.0);
        assert!(inv.audit(1e-6).ok);
    }

    #[test]
    fn audit_reports_component_drift_without_correcting() {
        let mut inv = inventory();
        inv.components.rcs_water += 10.0;
        let report = inv.audit(0.01);
        assert!(!report.ok);
        assert!((report.residual + 10.0).abs() < 1e-9);
        assert!(report.independent_residual.abs() < 1e-9);
        // Still drifted: the audit is read-only.
        assert!(!inv.audit(0.01).ok);
    }
}
