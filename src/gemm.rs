//! GEMM kernel family
//!
//! Three competing implementations of `C = alpha * op(A) @ op(B) + beta * C`:
//!
//! - [`GemmRef`] — unconstrained reference kernel; runs anything with
//!   uniform element types, slowest per element.
//! - [`GemmTiled`] — 16×16 shared-tile kernel; requires 16-aligned M/N/K
//!   and untransposed row-major inputs, fastest per element.
//! - [`GemmHalfVec`] — 8-wide vectorized half-precision kernel; requires
//!   all-F16 operands and an 8-divisible N.
//!
//! Each candidate's launch geometry spans the output tile space (M × N);
//! reduction over K happens inside a work item.

use half::f16;

use crate::candidate::KernelCandidate;
use crate::dispatch::{axis_geometry, DeviceInfo, DispatchData, DEFAULT_AXIS_GROUP_CAP};
use crate::error::Result;
use crate::jit::{ConstantValue, JitConstants};
use crate::params::{GemmParams, OperatorFamily, OperatorParams, OptionalParams};
use crate::tensor::{DataType, Layout, TensorDescriptor};

/// Tile edge of the tiled kernel
const TILE_SIZE: usize = 16;

/// Vector width of the half-precision kernel
const VEC_WIDTH: usize = 8;

/// The GEMM variant wrapped by `params`, if any
fn gemm_params(params: &OperatorParams) -> Option<&GemmParams> {
    match params {
        OperatorParams::Gemm(p) => Some(p),
        OperatorParams::Softmax(_) => None,
    }
}

/// All operands share one element type
fn uniform_dtype(p: &GemmParams) -> Option<DataType> {
    let dt = p.input_a().data_type();
    if p.input_b().data_type() == dt && p.output().data_type() == dt {
        Some(dt)
    } else {
        None
    }
}

/// Output-tile launch geometry shared by the GEMM candidates
///
/// Axis 0 covers M, axis 1 covers N. The per-axis cap is the candidate's
/// tile default, lowered further by a `preferred_group_size` hint.
fn gemm_dispatch(p: &GemmParams, device: &DeviceInfo, hints: &OptionalParams, cap: usize) -> Result<DispatchData> {
    let cap = hints.preferred_group_size.map_or(cap, |h| h.min(cap));
    let axes = vec![
        axis_geometry(p.m(), device, cap),
        axis_geometry(p.n(), device, cap),
    ];
    DispatchData::new(axes, vec![0, 1])
}

/// Per-dimension pitch bindings for one rank-2 operand
///
/// X is the column axis (dim 1), Y the row axis (dim 0). Binding both
/// pitches lets a single template address row-major and column-major
/// operands without a layout branch.
fn set_pitches(c: &mut JitConstants, prefix: &str, t: &TensorDescriptor) {
    c.set(
        format!("{prefix}_X_PITCH"),
        ConstantValue::Int(to_i64(t.strides()[1])),
    );
    c.set(
        format!("{prefix}_Y_PITCH"),
        ConstantValue::Int(to_i64(t.strides()[0])),
    );
    c.set(format!("{prefix}_OFFSET"), ConstantValue::Int(0));
}

/// Constant bindings every GEMM template requires
fn gemm_common_constants(p: &GemmParams, accumulator: DataType) -> JitConstants {
    let mut c = JitConstants::new();
    c.set(
        "INPUT0_TYPE",
        ConstantValue::Expr(p.input_a().data_type().jit_name().to_string()),
    );
    c.set(
        "INPUT1_TYPE",
        ConstantValue::Expr(p.input_b().data_type().jit_name().to_string()),
    );
    c.set(
        "OUTPUT_TYPE",
        ConstantValue::Expr(p.output().data_type().jit_name().to_string()),
    );
    c.set(
        "ACCUMULATOR_TYPE",
        ConstantValue::Expr(accumulator.jit_name().to_string()),
    );
    c.set("M", ConstantValue::Int(to_i64(p.m())));
    c.set("N", ConstantValue::Int(to_i64(p.n())));
    c.set("K", ConstantValue::Int(to_i64(p.k())));
    c.set("ALPHA", ConstantValue::Float(f64::from(p.alpha())));
    c.set("BETA", ConstantValue::Float(f64::from(p.beta())));
    c.set("TRANSPOSE_INPUT0", ConstantValue::Bool(p.transpose_a()));
    c.set("TRANSPOSE_INPUT1", ConstantValue::Bool(p.transpose_b()));
    set_pitches(&mut c, "INPUT0", p.input_a());
    set_pitches(&mut c, "INPUT1", p.input_b());
    set_pitches(&mut c, "OUTPUT", p.output());
    c
}

#[allow(clippy::cast_possible_wrap)] // tensor extents are far below i64::MAX
fn to_i64(v: usize) -> i64 {
    v as i64
}

/// Multiply-accumulate count of the instance, the base unit of cost
#[allow(clippy::cast_precision_loss)] // relative cost, precision loss is fine
fn gemm_work(p: &GemmParams) -> f64 {
    (p.m() * p.n() * p.k()) as f64
}

/// Unconstrained reference GEMM
///
/// Handles any uniform-dtype instance, transposed or not, in either
/// rank-2 layout. The safety net every shape falls back to.
#[derive(Debug, Default, Clone, Copy)]
pub struct GemmRef;

/// Relative cost per multiply-accumulate of the reference kernel
const REF_COST_PER_MAC: f64 = 1.0;

impl KernelCandidate for GemmRef {
    fn family(&self) -> OperatorFamily {
        OperatorFamily::Gemm
    }

    fn name(&self) -> &'static str {
        "gemm_ref"
    }

    fn is_applicable(&self, params: &OperatorParams) -> bool {
        gemm_params(params).is_some_and(|p| uniform_dtype(p).is_some())
    }

    fn dispatch_data(
        &self,
        params: &OperatorParams,
        device: &DeviceInfo,
        hints: &OptionalParams,
    ) -> Result<DispatchData> {
        let p = expect_gemm(params)?;
        gemm_dispatch(p, device, hints, DEFAULT_AXIS_GROUP_CAP)
    }

    fn jit_constants(
        &self,
        params: &OperatorParams,
        _dispatch: &DispatchData,
    ) -> Result<JitConstants> {
        let p = expect_gemm(params)?;
        Ok(gemm_common_constants(p, self.accumulator_type(params)))
    }

    fn accumulator_type(&self, params: &OperatorParams) -> DataType {
        gemm_params(params)
            .map_or(DataType::F32, |p| p.input_a().data_type().accumulator())
    }

    fn estimate_cost(&self, params: &OperatorParams, _dispatch: &DispatchData) -> f64 {
        gemm_params(params).map_or(f64::INFINITY, |p| gemm_work(p) * REF_COST_PER_MAC)
    }
}

/// 16×16 tiled GEMM
///
/// Stages tiles of A and B through group-shared memory; profitable only
/// when every dimension fills whole tiles, so it rejects anything not
/// 16-aligned, transposed inputs, and non-row-major operands.
#[derive(Debug, Default, Clone, Copy)]
pub struct GemmTiled;

/// Relative cost per multiply-accumulate of the tiled kernel
const TILED_COST_PER_MAC: f64 = 0.25;

impl KernelCandidate for GemmTiled {
    fn family(&self) -> OperatorFamily {
        OperatorFamily::Gemm
    }

    fn name(&self) -> &'static str {
        "gemm_tiled_16"
    }

    fn is_applicable(&self, params: &OperatorParams) -> bool {
        let Some(p) = gemm_params(params) else {
            return false;
        };
        if uniform_dtype(p).is_none() || p.transpose_a() || p.transpose_b() {
            return false;
        }
        let row_major = [p.input_a(), p.input_b(), p.output()]
            .iter()
            .all(|t| t.layout() == Layout::Nc);
        row_major
            && p.m() % TILE_SIZE == 0
            && p.n() % TILE_SIZE == 0
            && p.k() % TILE_SIZE == 0
    }

    fn dispatch_data(
        &self,
        params: &OperatorParams,
        device: &DeviceInfo,
        hints: &OptionalParams,
    ) -> Result<DispatchData> {
        let p = expect_gemm(params)?;
        gemm_dispatch(p, device, hints, TILE_SIZE)
    }

    fn jit_constants(
        &self,
        params: &OperatorParams,
        _dispatch: &DispatchData,
    ) -> Result<JitConstants> {
        let p = expect_gemm(params)?;
        let mut c = gemm_common_constants(p, self.accumulator_type(params));
        c.set("TILE_SIZE", ConstantValue::Int(to_i64(TILE_SIZE)));
        Ok(c)
    }

    fn accumulator_type(&self, params: &OperatorParams) -> DataType {
        gemm_params(params)
            .map_or(DataType::F32, |p| p.input_a().data_type().accumulator())
    }

    fn estimate_cost(&self, params: &OperatorParams, _dispatch: &DispatchData) -> f64 {
        gemm_params(params).map_or(f64::INFINITY, |p| gemm_work(p) * TILED_COST_PER_MAC)
    }
}

/// 8-wide vectorized half-precision GEMM
///
/// Loads B and C as 8-element half vectors. Scalar multipliers are lowered
/// to half-precision literals, matching the width the kernel computes in.
#[derive(Debug, Default, Clone, Copy)]
pub struct GemmHalfVec;

/// Relative cost per multiply-accumulate of the vectorized half kernel
const HALF_VEC_COST_PER_MAC: f64 = 0.5;

impl KernelCandidate for GemmHalfVec {
    fn family(&self) -> OperatorFamily {
        OperatorFamily::Gemm
    }

    fn name(&self) -> &'static str {
        "gemm_half_vec8"
    }

    fn is_applicable(&self, params: &OperatorParams) -> bool {
        let Some(p) = gemm_params(params) else {
            return false;
        };
        uniform_dtype(p) == Some(DataType::F16)
            && !p.transpose_a()
            && !p.transpose_b()
            && [p.input_a(), p.input_b(), p.output()]
                .iter()
                .all(|t| t.layout() == Layout::Nc)
            && p.n() % VEC_WIDTH == 0
    }

    fn dispatch_data(
        &self,
        params: &OperatorParams,
        device: &DeviceInfo,
        hints: &OptionalParams,
    ) -> Result<DispatchData> {
        let p = expect_gemm(params)?;
        gemm_dispatch(p, device, hints, DEFAULT_AXIS_GROUP_CAP)
    }

    fn jit_constants(
        &self,
        params: &OperatorParams,
        _dispatch: &DispatchData,
    ) -> Result<JitConstants> {
        let p = expect_gemm(params)?;
        let mut c = gemm_common_constants(p, self.accumulator_type(params));
        // Multipliers rounded to the half width the kernel computes in.
        c.set(
            "ALPHA",
            ConstantValue::Float(f64::from(f16::from_f32(p.alpha()).to_f32())),
        );
        c.set(
            "BETA",
            ConstantValue::Float(f64::from(f16::from_f32(p.beta()).to_f32())),
        );
        c.set("VEC_WIDTH", ConstantValue::Int(to_i64(VEC_WIDTH)));
        Ok(c)
    }

    fn accumulator_type(&self, params: &OperatorParams) -> DataType {
        gemm_params(params)
            .map_or(DataType::F32, |p| p.input_a().data_type().accumulator())
    }

    fn estimate_cost(&self, params: &OperatorParams, _dispatch: &DispatchData) -> f64 {
        gemm_params(params).map_or(f64::INFINITY, |p| gemm_work(p) * HALF_VEC_COST_PER_MAC)
    }
}

/// GEMM parameters or the invalid-parameter error a non-GEMM call deserves
fn expect_gemm(params: &OperatorParams) -> Result<&GemmParams> {
    gemm_params(params).ok_or_else(|| crate::error::DespacharError::InvalidParameter {
        reason: format!(
            "gemm candidate invoked with {} parameters",
            params.family()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(shape: Vec<usize>, dt: DataType) -> TensorDescriptor {
        TensorDescriptor::new(shape, dt, Layout::Nc).unwrap()
    }

    fn gemm_f32(m: usize, n: usize, k: usize) -> OperatorParams {
        OperatorParams::Gemm(
            GemmParams::with_descriptors(
                desc(vec![m, k], DataType::F32),
                desc(vec![k, n], DataType::F32),
                desc(vec![m, n], DataType::F32),
                1.0,
                0.0,
                false,
                false,
            )
            .unwrap(),
        )
    }

    fn gemm_f16(m: usize, n: usize, k: usize) -> OperatorParams {
        OperatorParams::Gemm(
            GemmParams::with_descriptors(
                desc(vec![m, k], DataType::F16),
                desc(vec![k, n], DataType::F16),
                desc(vec![m, n], DataType::F16),
                1.0,
                0.0,
                false,
                false,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_ref_applies_to_any_uniform_gemm() {
        assert!(GemmRef.is_applicable(&gemm_f32(65, 3, 7)));
        assert!(GemmRef.is_applicable(&gemm_f16(65, 3, 7)));
    }

    #[test]
    fn test_ref_rejects_mixed_dtypes() {
        let p = OperatorParams::Gemm(
            GemmParams::with_descriptors(
                desc(vec![4, 4], DataType::F16),
                desc(vec![4, 4], DataType::F32),
                desc(vec![4, 4], DataType::F32),
                1.0,
                0.0,
                false,
                false,
            )
            .unwrap(),
        );
        assert!(!GemmRef.is_applicable(&p));
    }

    #[test]
    fn test_tiled_requires_alignment() {
        assert!(GemmTiled.is_applicable(&gemm_f32(64, 256, 128)));
        assert!(!GemmTiled.is_applicable(&gemm_f32(65, 256, 128)));
        assert!(!GemmTiled.is_applicable(&gemm_f32(64, 250, 128)));
        assert!(!GemmTiled.is_applicable(&gemm_f32(64, 256, 100)));
    }

    #[test]
    fn test_tiled_rejects_transposed() {
        let p = OperatorParams::Gemm(
            GemmParams::with_descriptors(
                desc(vec![128, 64], DataType::F32),
                desc(vec![128, 256], DataType::F32),
                desc(vec![64, 256], DataType::F32),
                1.0,
                0.0,
                true,
                false,
            )
            .unwrap(),
        );
        assert!(!GemmTiled.is_applicable(&p));
    }

    #[test]
    fn test_half_vec_requires_f16() {
        assert!(GemmHalfVec.is_applicable(&gemm_f16(3, 8, 5)));
        assert!(!GemmHalfVec.is_applicable(&gemm_f32(3, 8, 5)));
        assert!(!GemmHalfVec.is_applicable(&gemm_f16(3, 9, 5)));
    }

    #[test]
    fn test_cost_ordering() {
        let p = gemm_f32(64, 256, 128);
        let device = DeviceInfo::default();
        let hints = OptionalParams::default();
        let d_ref = GemmRef.dispatch_data(&p, &device, &hints).unwrap();
        let d_tiled = GemmTiled.dispatch_data(&p, &device, &hints).unwrap();
        assert!(GemmTiled.estimate_cost(&p, &d_tiled) < GemmRef.estimate_cost(&p, &d_ref));
    }

    #[test]
    fn test_tiled_dispatch_geometry() {
        let p = gemm_f32(64, 256, 128);
        let d = GemmTiled
            .dispatch_data(&p, &DeviceInfo::default(), &OptionalParams::default())
            .unwrap();
        assert_eq!(d.group_sizes(), vec![16, 16]);
        assert_eq!(d.group_counts(), vec![4, 16]);
        assert!(d.axes().iter().all(|a| !a.uneven));
    }

    #[test]
    fn test_group_size_hint_lowers_cap() {
        let p = gemm_f32(64, 256, 128);
        let hints = OptionalParams::default().with_preferred_group_size(8);
        let d = GemmTiled
            .dispatch_data(&p, &DeviceInfo::default(), &hints)
            .unwrap();
        assert_eq!(d.group_sizes(), vec![8, 8]);
    }

    #[test]
    fn test_common_constants_complete() {
        let p = gemm_f32(64, 256, 128);
        let d = GemmTiled
            .dispatch_data(&p, &DeviceInfo::default(), &OptionalParams::default())
            .unwrap();
        let c = GemmTiled.jit_constants(&p, &d).unwrap();
        for name in [
            "INPUT0_TYPE",
            "INPUT1_TYPE",
            "OUTPUT_TYPE",
            "ACCUMULATOR_TYPE",
            "M",
            "N",
            "K",
            "ALPHA",
            "BETA",
            "TRANSPOSE_INPUT0",
            "TRANSPOSE_INPUT1",
            "INPUT0_X_PITCH",
            "INPUT0_Y_PITCH",
            "INPUT1_X_PITCH",
            "INPUT1_Y_PITCH",
            "OUTPUT_X_PITCH",
            "OUTPUT_Y_PITCH",
            "TILE_SIZE",
        ] {
            assert!(c.get(name).is_some(), "missing constant {name}");
        }
        assert_eq!(c.render("M").as_deref(), Some("64"));
        assert_eq!(c.render("TRANSPOSE_INPUT0").as_deref(), Some("0"));
        assert_eq!(c.render("INPUT0_TYPE").as_deref(), Some("float"));
        // Row-major [64, 128]: column axis contiguous, row pitch = K.
        assert_eq!(c.render("INPUT0_X_PITCH").as_deref(), Some("1"));
        assert_eq!(c.render("INPUT0_Y_PITCH").as_deref(), Some("128"));
    }

    #[test]
    fn test_column_major_operand_pitches_fully_bound() {
        // B in column-major: strides [1, 128]. Both pitches must survive
        // into the constants so the template can address it unbranched.
        let p = OperatorParams::Gemm(
            GemmParams::with_descriptors(
                desc(vec![64, 128], DataType::F32),
                TensorDescriptor::new(vec![128, 256], DataType::F32, Layout::Cn).unwrap(),
                desc(vec![64, 256], DataType::F32),
                1.0,
                0.0,
                false,
                false,
            )
            .unwrap(),
        );
        assert!(GemmRef.is_applicable(&p));
        let d = GemmRef
            .dispatch_data(&p, &DeviceInfo::default(), &OptionalParams::default())
            .unwrap();
        let c = GemmRef.jit_constants(&p, &d).unwrap();
        assert_eq!(c.render("INPUT1_X_PITCH").as_deref(), Some("128"));
        assert_eq!(c.render("INPUT1_Y_PITCH").as_deref(), Some("1"));
    }

    #[test]
    fn test_half_vec_lowers_multipliers_to_half_width() {
        let p = OperatorParams::Gemm(
            GemmParams::with_descriptors(
                desc(vec![4, 8], DataType::F16),
                desc(vec![8, 8], DataType::F16),
                desc(vec![4, 8], DataType::F16),
                0.1,
                0.0,
                false,
                false,
            )
            .unwrap(),
        );
        let d = GemmHalfVec
            .dispatch_data(&p, &DeviceInfo::default(), &OptionalParams::default())
            .unwrap();
        let c = GemmHalfVec.jit_constants(&p, &d).unwrap();
        let Some(ConstantValue::Float(alpha)) = c.get("ALPHA") else {
            panic!("ALPHA must be a float literal");
        };
        // 0.1 is not representable in f16; the lowered literal is the rounded value.
        assert!((alpha - f64::from(f16::from_f32(0.1).to_f32())).abs() < 1e-9);
        assert_ne!(*alpha, f64::from(0.1f32));
        assert_eq!(c.render("VEC_WIDTH").as_deref(), Some("8"));
    }

    #[test]
    fn test_accumulator_policy() {
        let p16 = gemm_f16(4, 8, 4);
        let p32 = gemm_f32(4, 8, 4);
        assert_eq!(GemmHalfVec.accumulator_type(&p16), DataType::F32);
        assert_eq!(GemmRef.accumulator_type(&p32), DataType::F32);
    }
}
