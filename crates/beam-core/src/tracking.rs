//! Slice-ordered lattice traversal.
//!
//! The sequencer walks the lattice element by element and slice by slice.
//! Within a slice every stored particle is pushed against the pre-slice
//! reference state; the reference particle itself advances once per slice,
//! after the ensemble. Tracking happens in the fixed-s frame: the bunch is
//! mapped in on entry and back to the fixed-t frame on exit.

use crate::bunch::ParticleBunch;
use crate::elements::Element;
use crate::transformation::{coordinate_transformation, Direction};
use beam_types::config::ElementConfig;
use beam_types::error::BeamResult;
use beam_types::state::PhasePoint;

/// Identifies one completed slice during traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceContext {
    pub element: usize, // element index within the lattice
    pub slice: usize,   // slice index within the element
    pub s: f64,         // reference path length after the slice [m]
}

/// Ordered sequence of lattice elements with slice-resolved traversal.
#[derive(Debug, Clone, Default)]
pub struct LatticeSequencer {
    elements: Vec<Element>,
}

impl LatticeSequencer {
    pub fn new(elements: Vec<Element>) -> Self {
        LatticeSequencer { elements }
    }

    /// Build the lattice from deck records, validating every element.
    pub fn from_configs(configs: &[ElementConfig]) -> BeamResult<Self> {
        let elements = configs
            .iter()
            .map(Element::from_config)
            .collect::<BeamResult<Vec<_>>>()?;
        Ok(LatticeSequencer { elements })
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Summed design length of the lattice [m].
    pub fn total_length_m(&self) -> f64 {
        self.elements.iter().map(Element::ds).sum()
    }

    /// Total number of slices a traversal visits.
    pub fn total_slices(&self) -> usize {
        self.elements.iter().map(Element::nslice).sum()
    }

    /// Push the bunch through every element, slice by slice.
    pub fn track(&self, bunch: &mut ParticleBunch) -> BeamResult<()> {
        self.track_with(bunch, |_, _| Ok(()))
    }

    /// Push the bunch with a per-slice callback.
    ///
    /// The callback runs after each completed slice and is the coupling
    /// point for space-charge deposit/solve/kick cycles. An error from the
    /// callback aborts the traversal, leaving the bunch in the fixed-s
    /// frame at the failed slice.
    pub fn track_with<F>(&self, bunch: &mut ParticleBunch, mut after_slice: F) -> BeamResult<()>
    where
        F: FnMut(&mut ParticleBunch, SliceContext) -> BeamResult<()>,
    {
        coordinate_transformation(bunch, Direction::ToFixedS)?;
        for (element_idx, element) in self.elements.iter().enumerate() {
            log::debug!(
                "element {element_idx} ({}): {} slice(s) of {} m",
                element.name(),
                element.nslice(),
                element.slice_ds()
            );
            for slice_idx in 0..element.nslice() {
                push_slice(bunch, element);
                after_slice(
                    bunch,
                    SliceContext {
                        element: element_idx,
                        slice: slice_idx,
                        s: bunch.ref_part.s,
                    },
                )?;
            }
        }
        coordinate_transformation(bunch, Direction::ToFixedT)?;
        log::info!(
            "tracked {} particles through {} elements ({} slices, {} m)",
            bunch.npart(),
            self.elements.len(),
            self.total_slices(),
            self.total_length_m()
        );
        Ok(())
    }
}

/// Advance every particle through one slice of `element`, then the
/// reference particle. The bunch must already be in the fixed-s frame.
pub fn push_slice(bunch: &mut ParticleBunch, element: &Element) {
    use rayon::prelude::*;
    let ref_before = bunch.ref_part;
    (
        &mut bunch.x[..],
        &mut bunch.y[..],
        &mut bunch.t[..],
        &mut bunch.px[..],
        &mut bunch.py[..],
        &mut bunch.pt[..],
    )
        .into_par_iter()
        .for_each(|(x, y, t, px, py, pt)| {
            let p = PhasePoint {
                x: *x,
                y: *y,
                t: *t,
                px: *px,
                py: *py,
                pt: *pt,
            };
            let out = element.push_particle(p, &ref_before);
            *x = out.x;
            *y = out.y;
            *t = out.t;
            *px = out.px;
            *py = out.py;
            *pt = out.pt;
        });
    element.push_reference(&mut bunch.ref_part);
}
