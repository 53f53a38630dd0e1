use pgk_geometry::curve::{Curve, NurbsCurve, NurbsCurveData};
use pgk_geometry::surface::{NurbsSurface, NurbsSurfaceData, SphericalSurface, Surface};
use pgk_math::{dvec3, linspace, DVec3};

#[test]
fn curve_data_round_trips_through_json() {
    let curve = NurbsCurve::new(
        2,
        vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0],
        vec![dvec3(0.0, 0.0, 0.0), dvec3(1.0, 2.0, 0.0), dvec3(2.0, 0.0, 1.0), dvec3(3.0, 1.0, 0.0)],
        vec![1.0, 0.5, 2.0, 1.0],
    )
    .unwrap();
    let json = serde_json::to_string(&curve.to_data()).unwrap();
    let data: NurbsCurveData = serde_json::from_str(&json).unwrap();
    let restored = NurbsCurve::from_data(&data).unwrap();
    for t in linspace(0.0, 1.0, 21) {
        assert_eq!(curve.point_at(t), restored.point_at(t));
    }
}

#[test]
fn surface_data_round_trips_through_json() {
    let sphere = SphericalSurface::new(dvec3(0.5, 0.0, -1.0), 2.0).to_nurbs().unwrap();
    let json = serde_json::to_string(&sphere.to_data()).unwrap();
    let data: NurbsSurfaceData = serde_json::from_str(&json).unwrap();
    let restored = NurbsSurface::from_data(&data).unwrap();
    let (u0, u1) = sphere.domain_u();
    let (v0, v1) = sphere.domain_v();
    for u in linspace(u0, u1, 9) {
        for v in linspace(v0, v1, 5) {
            assert_eq!(sphere.point_at(u, v), restored.point_at(u, v));
        }
    }
}

#[test]
fn invalid_data_is_rejected() {
    let data = NurbsCurveData {
        degree: 3,
        knots: vec![0.0, 0.0, 1.0, 1.0],
        control_points: vec![[0.0; 3], [1.0, 0.0, 0.0]],
        weights: vec![1.0, 1.0],
    };
    assert!(NurbsCurve::from_data(&data).is_err());

    let mut surface = NurbsSurface::bspline(
        1,
        1,
        vec![0.0, 0.0, 1.0, 1.0],
        vec![0.0, 0.0, 1.0, 1.0],
        vec![vec![DVec3::ZERO, DVec3::Y], vec![DVec3::X, DVec3::ONE]],
    )
    .unwrap()
    .to_data();
    surface.weights[1][0] = -1.0;
    assert!(NurbsSurface::from_data(&surface).is_err());
}
