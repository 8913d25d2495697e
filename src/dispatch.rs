//! Launch-geometry engine
//!
//! Maps logical tensor extents into a hardware launch grid: per axis, the
//! extent is padded to the device's preferred multiple, partitioned into
//! work groups, and tagged "uneven" when padding was required so the
//! executing kernel knows to bounds-check the remainder. Axes combine
//! independently; total work equals the product of per-axis
//! `group_size * group_count`.

use serde::{Deserialize, Serialize};

use crate::error::{DespacharError, Result};

/// Default per-axis work-group size cap when a candidate supplies none
pub const DEFAULT_AXIS_GROUP_CAP: usize = 16;

/// Target execution profile of the device the kernel will launch on
///
/// # Examples
///
/// ```
/// use despachar::dispatch::DeviceInfo;
///
/// let device = DeviceInfo::default();
/// assert_eq!(device.max_group_size, 256);
/// assert_eq!(device.preferred_multiple, 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Maximum work items per group the device supports
    pub max_group_size: usize,
    /// Extent multiple the hardware prefers (padding target)
    pub preferred_multiple: usize,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            max_group_size: 256,
            preferred_multiple: 16,
        }
    }
}

impl DeviceInfo {
    /// Override the maximum group size
    #[must_use]
    pub fn with_max_group_size(mut self, size: usize) -> Self {
        self.max_group_size = size;
        self
    }

    /// Override the preferred extent multiple
    #[must_use]
    pub fn with_preferred_multiple(mut self, multiple: usize) -> Self {
        self.preferred_multiple = multiple;
        self
    }
}

/// How the executing kernel handles work items past the logical extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemainderRule {
    /// Extent padded upward; the kernel bounds-checks the tail work items
    Pad,
    /// Final group processes a short tail; the kernel clamps its range
    Clamp,
}

/// Launch geometry of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisGeometry {
    /// Logical tensor extent
    pub extent: usize,
    /// Extent after padding to the device's preferred multiple
    pub padded_extent: usize,
    /// Work items per group
    pub group_size: usize,
    /// Number of groups
    pub group_count: usize,
    /// True when `padded_extent != extent`; the kernel must handle the remainder
    pub uneven: bool,
    /// Remainder-handling contract for uneven axes
    pub remainder: RemainderRule,
}

/// Compute the launch geometry of a single axis
///
/// The padded extent is `extent` rounded up to the device's preferred
/// multiple. The group size is the largest divisor of the device's maximum
/// group size that also divides the padded extent, capped by `cap` (the
/// candidate's per-axis tuning default, possibly lowered by a hint). Group
/// size 1 always satisfies both conditions, so the result is total.
#[must_use]
pub fn axis_geometry(extent: usize, device: &DeviceInfo, cap: usize) -> AxisGeometry {
    let multiple = device.preferred_multiple.max(1);
    let padded = extent.div_ceil(multiple) * multiple;
    let cap = cap.max(1);

    let mut group_size = 1;
    for d in (1..=device.max_group_size.min(cap)).rev() {
        if device.max_group_size % d == 0 && padded % d == 0 {
            group_size = d;
            break;
        }
    }

    AxisGeometry {
        extent,
        padded_extent: padded,
        group_size,
        group_count: padded / group_size,
        uneven: padded != extent,
        remainder: RemainderRule::Pad,
    }
}

/// Launch geometry for one chosen candidate on one device
///
/// `axis_order[i]` names the logical tensor axis mapped to launch axis `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchData {
    axes: Vec<AxisGeometry>,
    axis_order: Vec<usize>,
}

impl DispatchData {
    /// Assemble dispatch data from per-axis geometries
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `axis_order` is not a permutation of
    /// `0..axes.len()`.
    pub fn new(axes: Vec<AxisGeometry>, axis_order: Vec<usize>) -> Result<Self> {
        let mut sorted = axis_order.clone();
        sorted.sort_unstable();
        if sorted != (0..axes.len()).collect::<Vec<_>>() {
            return Err(DespacharError::InvalidParameter {
                reason: format!(
                    "axis_order {axis_order:?} is not a permutation of 0..{}",
                    axes.len()
                ),
            });
        }
        Ok(Self { axes, axis_order })
    }

    /// Per-axis geometries, in launch-axis order
    #[must_use]
    pub fn axes(&self) -> &[AxisGeometry] {
        &self.axes
    }

    /// Logical tensor axis mapped to each launch axis
    #[must_use]
    pub fn axis_order(&self) -> &[usize] {
        &self.axis_order
    }

    /// Group size per launch axis
    #[must_use]
    pub fn group_sizes(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.group_size).collect()
    }

    /// Group count per launch axis
    #[must_use]
    pub fn group_counts(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.group_count).collect()
    }

    /// Total work items: product of per-axis `group_size * group_count`
    #[must_use]
    pub fn total_work_items(&self) -> usize {
        self.axes
            .iter()
            .map(|a| a.group_size * a.group_count)
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_axis() {
        let g = axis_geometry(64, &DeviceInfo::default(), 16);
        assert_eq!(g.padded_extent, 64);
        assert_eq!(g.group_size, 16);
        assert_eq!(g.group_count, 4);
        assert!(!g.uneven);
    }

    #[test]
    fn test_uneven_axis_pads_up() {
        let g = axis_geometry(65, &DeviceInfo::default(), 16);
        assert_eq!(g.padded_extent, 80);
        assert_eq!(g.group_size, 16);
        assert_eq!(g.group_count, 5);
        assert!(g.uneven);
        assert_eq!(g.remainder, RemainderRule::Pad);
    }

    #[test]
    fn test_cap_limits_group_size() {
        let g = axis_geometry(64, &DeviceInfo::default(), 8);
        assert_eq!(g.group_size, 8);
        assert_eq!(g.group_count, 8);
    }

    #[test]
    fn test_group_size_divides_max_group_size() {
        // padded = 48; largest divisor of 256 dividing 48 under cap 16 is 16.
        let device = DeviceInfo::default().with_preferred_multiple(8);
        let g = axis_geometry(48, &device, 16);
        assert_eq!(g.padded_extent, 48);
        assert_eq!(g.group_size, 16);
        assert_eq!(g.group_count, 3);
    }

    #[test]
    fn test_coprime_extent_falls_back_to_one() {
        // padded = 7 with multiple 1; no divisor of 256 above 1 divides 7.
        let device = DeviceInfo::default().with_preferred_multiple(1);
        let g = axis_geometry(7, &device, 16);
        assert_eq!(g.group_size, 1);
        assert_eq!(g.group_count, 7);
        assert!(!g.uneven);
    }

    #[test]
    fn test_coverage_invariant() {
        for extent in 1..200 {
            let g = axis_geometry(extent, &DeviceInfo::default(), 16);
            assert!(g.group_size * g.group_count >= extent);
            if !g.uneven {
                assert_eq!(g.group_size * g.group_count, extent);
            }
        }
    }

    #[test]
    fn test_dispatch_data_rejects_bad_order() {
        let axes = vec![
            axis_geometry(16, &DeviceInfo::default(), 16),
            axis_geometry(32, &DeviceInfo::default(), 16),
        ];
        assert!(DispatchData::new(axes, vec![0, 0]).is_err());
    }

    #[test]
    fn test_total_work_items() {
        let device = DeviceInfo::default();
        let axes = vec![axis_geometry(64, &device, 16), axis_geometry(256, &device, 16)];
        let d = DispatchData::new(axes, vec![0, 1]).unwrap();
        assert_eq!(d.total_work_items(), 64 * 256);
        assert_eq!(d.group_sizes(), vec![16, 16]);
        assert_eq!(d.group_counts(), vec![4, 16]);
    }
}
