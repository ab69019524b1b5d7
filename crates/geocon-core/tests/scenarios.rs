//! 端到端作图场景：构建、拖动、删除后检查依赖关系是否仍然成立

use approx::assert_relative_eq;
use geocon_core::geometry::{distance_to_line, intersect_lines};
use geocon_core::prelude::*;

fn pos(model: &Model, id: PointId) -> Point2 {
    model.position(id).expect("point exists")
}

fn snapshot(model: &Model) -> Vec<(PointId, Point2, bool)> {
    model.points().iter().map(|p| (p.id, p.position, p.is_hidden())).collect()
}

#[test]
fn line_line_intersection_follows_both_lines() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(10.0, 10.0));
    let c = model.add_point(Point2::new(0.0, 10.0));
    let d = model.add_point(Point2::new(10.0, 0.0));
    let ab = model.add_line(a, b).unwrap();
    let cd = model.add_line(c, d).unwrap();
    let x = model
        .add_intersection_point(ParentRef::Line(ab), ParentRef::Line(cd), Point2::new(5.0, 5.0))
        .unwrap();
    assert_relative_eq!(pos(&model, x).x, 5.0, epsilon = 1e-9);
    assert_relative_eq!(pos(&model, x).y, 5.0, epsilon = 1e-9);

    model.set_point_position(a, Point2::new(0.0, -10.0)).unwrap();

    let expected = intersect_lines(&pos(&model, a), &pos(&model, b), &pos(&model, c), &pos(&model, d)).unwrap();
    let px = pos(&model, x);
    assert_relative_eq!(px.x, expected.x, epsilon = 1e-9);
    assert_relative_eq!(px.y, expected.y, epsilon = 1e-9);
    assert_relative_eq!(px.x, 20.0 / 3.0, epsilon = 1e-9);
    assert!(!model.point(x).unwrap().is_hidden());
    assert!(model.line(ab).unwrap().contains(x));
    assert!(model.line(cd).unwrap().contains(x));
}

#[test]
fn circle_circle_intersections_keep_their_side() {
    let mut model = Model::new();
    let c1 = model.add_point(Point2::new(0.0, 0.0));
    let r1 = model.add_point(Point2::new(5.0, 0.0));
    let c2 = model.add_point(Point2::new(6.0, 0.0));
    let r2 = model.add_point(Point2::new(11.0, 0.0));
    let first = model.add_circle(c1, r1).unwrap();
    let second = model.add_circle(c2, r2).unwrap();

    let points = model
        .add_intersection_points(ParentRef::Circle(first), ParentRef::Circle(second))
        .unwrap();
    assert_eq!(points.len(), 2);
    let upper = *points.iter().find(|&&id| pos(&model, id).y > 0.0).unwrap();
    let lower = *points.iter().find(|&&id| pos(&model, id).y < 0.0).unwrap();
    assert_relative_eq!(pos(&model, upper).x, 3.0, epsilon = 1e-9);
    assert_relative_eq!(pos(&model, upper).y, 4.0, epsilon = 1e-9);

    model.set_point_position(c2, Point2::new(6.2, 0.1)).unwrap();

    assert!(pos(&model, upper).y > 0.0);
    assert!(pos(&model, lower).y < 0.0);
    for id in [upper, lower] {
        let p = pos(&model, id);
        assert_relative_eq!((p - pos(&model, c1)).norm(), 5.0, epsilon = 1e-6);
        assert_relative_eq!((p - pos(&model, c2)).norm(), 5.0, epsilon = 1e-6);
    }
}

#[test]
fn deleting_reference_line_removes_parallel_and_helper() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(10.0, 0.0));
    let reference = model.add_line(a, b).unwrap();
    let t = model.add_point(Point2::new(0.0, 5.0));
    let parallel = model.add_parallel_line(t, reference).unwrap();
    let helper = model.line(parallel).unwrap().derived().unwrap().helper_point;

    let report = model.delete_entity(EntityRef::Line(reference)).unwrap();

    assert!(report.lines.contains(&reference));
    assert!(report.lines.contains(&parallel));
    assert!(report.points.contains(&helper));
    assert!(model.line(parallel).is_none());
    assert!(model.point(helper).is_none());
    assert!(model.point(t).is_some());
    assert!(model.check_consistency().is_empty());
}

#[test]
fn recompute_all_reaches_a_fixed_point() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(10.0, 2.0));
    let ab = model.add_line(a, b).unwrap();
    let t = model.add_point(Point2::new(3.0, 6.0));
    let perpendicular = model.add_perpendicular_line(t, ab).unwrap();
    model
        .add_intersection_point(ParentRef::Line(ab), ParentRef::Line(perpendicular), Point2::new(3.0, 0.0))
        .unwrap();
    let center = model.add_point(Point2::new(5.0, 5.0));
    let radius = model.add_point(Point2::new(9.0, 5.0));
    let circle = model.add_circle(center, radius).unwrap();
    model.add_point_on_object(ParentRef::Circle(circle), Point2::new(5.0, 12.0)).unwrap();
    model.add_midpoint(a, t).unwrap();
    model.add_symmetric_point(t, MirrorRef::Line(ab)).unwrap();

    recompute_all(&mut model);
    let before = snapshot(&model);
    recompute_all(&mut model);
    let after = snapshot(&model);

    assert_eq!(before.len(), after.len());
    for ((id0, p0, h0), (id1, p1, h1)) in before.iter().zip(after.iter()) {
        assert_eq!(id0, id1);
        assert_eq!(h0, h1);
        assert_relative_eq!(p0.x, p1.x, epsilon = 1e-9);
        assert_relative_eq!(p0.y, p1.y, epsilon = 1e-9);
    }
}

#[test]
fn sliders_stay_on_their_parents() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(10.0, 0.0));
    let line = model.add_line(a, b).unwrap();
    let on_line = model.add_point_on_object(ParentRef::Line(line), Point2::new(4.0, 1.0)).unwrap();

    let center = model.add_point(Point2::new(20.0, 0.0));
    let radius = model.add_point(Point2::new(25.0, 0.0));
    let circle = model.add_circle(center, radius).unwrap();
    let on_circle = model
        .add_point_on_object(ParentRef::Circle(circle), Point2::new(20.0, 9.0))
        .unwrap();

    model.set_point_position(b, Point2::new(6.0, 8.0)).unwrap();
    let p = pos(&model, on_line);
    assert!(distance_to_line(&p, &pos(&model, a), &pos(&model, b)) < 1e-9);
    // 比例 0.4 保持不变
    assert_relative_eq!(p.x, 2.4, epsilon = 1e-9);
    assert_relative_eq!(p.y, 3.2, epsilon = 1e-9);

    model.set_point_position(radius, Point2::new(28.0, 0.0)).unwrap();
    let p = pos(&model, on_circle);
    assert_relative_eq!((p - pos(&model, center)).norm(), 8.0, epsilon = 1e-9);
    assert_relative_eq!(p.x, 20.0, epsilon = 1e-9);
    assert_relative_eq!(p.y, 8.0, epsilon = 1e-9);
}

#[test]
fn perpendicular_line_stays_perpendicular() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(10.0, 0.0));
    let reference = model.add_line(a, b).unwrap();
    let t = model.add_point(Point2::new(2.0, 5.0));
    let perpendicular = model.add_perpendicular_line(t, reference).unwrap();

    for target in [Point2::new(8.0, 6.0), Point2::new(-3.0, 7.0), Point2::new(4.0, -9.0)] {
        model.set_point_position(b, target).unwrap();

        let [through, helper] = model.line(perpendicular).unwrap().defining_points;
        assert_eq!(through, t);
        let u = (pos(&model, helper) - pos(&model, through)).normalize();
        let v = (pos(&model, b) - pos(&model, a)).normalize();
        assert!(u.dot(&v).abs() < 1e-9);
        assert_relative_eq!(pos(&model, t).x, 2.0);
        assert_relative_eq!(pos(&model, t).y, 5.0);
    }
}

#[test]
fn midpoint_and_three_point_circle_follow_their_parents() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(6.0, 0.0));
    let c = model.add_point(Point2::new(0.0, 8.0));
    let ab = model.add_line(a, b).unwrap();
    let m = model.add_segment_midpoint(ab, 0).unwrap();
    let circle = model.add_circle_three_points(a, b, c).unwrap();
    let center = model.circle(circle).unwrap().center;
    assert_relative_eq!(pos(&model, center).x, 3.0, epsilon = 1e-9);
    assert_relative_eq!(pos(&model, center).y, 4.0, epsilon = 1e-9);

    model.set_point_position(b, Point2::new(10.0, 4.0)).unwrap();

    assert_relative_eq!(pos(&model, m).x, 5.0, epsilon = 1e-9);
    assert_relative_eq!(pos(&model, m).y, 2.0, epsilon = 1e-9);
    let pc = pos(&model, center);
    let r = model.radius(circle).unwrap();
    for id in [a, b, c] {
        assert_relative_eq!((pos(&model, id) - pc).norm(), r, epsilon = 1e-9);
    }
}

#[test]
fn deleting_circle_reclassifies_surviving_points() {
    let mut model = Model::new();
    let center = model.add_point(Point2::new(0.0, 0.0));
    let radius = model.add_point(Point2::new(5.0, 0.0));
    let circle = model.add_circle(center, radius).unwrap();
    let slider = model
        .add_point_on_object(ParentRef::Circle(circle), Point2::new(0.0, 6.0))
        .unwrap();
    let a = model.add_point(Point2::new(-10.0, 3.0));
    let b = model.add_point(Point2::new(10.0, 3.0));
    let line = model.add_line(a, b).unwrap();
    let x = model
        .add_intersection_point(ParentRef::Line(line), ParentRef::Circle(circle), Point2::new(4.0, 3.0))
        .unwrap();
    assert_relative_eq!(pos(&model, x).x, 4.0, epsilon = 1e-9);

    let report = model.delete_entity(EntityRef::Circle(circle)).unwrap();

    assert_eq!(report.circles, vec![circle]);
    for id in [center, radius, slider] {
        assert!(model.point(id).is_none());
    }
    let survivor = model.point(x).unwrap();
    assert_eq!(survivor.construction, ConstructionKind::OnObject);
    assert_eq!(survivor.parent_refs, vec![ParentRef::Line(line)]);
    assert!(model.check_consistency().is_empty());

    // 剩下的线上点仍然是滑动点
    model.set_point_position(x, Point2::new(-2.0, 9.0)).unwrap();
    assert_relative_eq!(pos(&model, x).y, 3.0, epsilon = 1e-9);
    assert_relative_eq!(pos(&model, x).x, -2.0, epsilon = 1e-9);
}

#[test]
fn deleting_vertex_removes_angle_and_polygon() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(4.0, 0.0));
    let c = model.add_point(Point2::new(0.0, 3.0));
    let ab = model.add_line(a, b).unwrap();
    let bc = model.add_line(b, c).unwrap();
    let ca = model.add_line(c, a).unwrap();
    let polygon = model.add_polygon(&[ab, bc, ca]).unwrap();
    let angle = model
        .add_angle(a, [AngleLeg { line: ab, seg: 0 }, AngleLeg { line: ca, seg: 0 }])
        .unwrap();

    let report = model.delete_entity(EntityRef::Point(a)).unwrap();

    assert_eq!(report.angles, vec![angle]);
    assert_eq!(report.polygons, vec![polygon]);
    assert!(model.line(ab).is_none());
    assert!(model.line(ca).is_none());
    assert!(model.line(bc).is_some());
    assert!(model.check_consistency().is_empty());
}

#[test]
fn polygon_drag_is_rigid() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(4.0, 0.0));
    let c = model.add_point(Point2::new(0.0, 3.0));
    let ab = model.add_line(a, b).unwrap();
    let bc = model.add_line(b, c).unwrap();
    let ca = model.add_line(c, a).unwrap();
    let polygon = model.add_polygon(&[ab, bc, ca]).unwrap();
    let m = model.add_midpoint(b, c).unwrap();

    let mut session = DragSession::begin(&model, DragTarget::Polygon(polygon), Point2::new(1.0, 1.0)).unwrap();
    session.update(&mut model, Point2::new(2.0, 2.0));
    session.update(&mut model, Point2::new(3.0, 4.0));
    let outcome = session.end(&mut model);

    assert!(outcome.moved);
    assert_eq!(outcome.snapped, None);
    assert_eq!(pos(&model, a), Point2::new(2.0, 3.0));
    assert_eq!(pos(&model, b), Point2::new(6.0, 3.0));
    assert_eq!(pos(&model, c), Point2::new(2.0, 6.0));
    assert_relative_eq!(model.line_length(bc).unwrap(), 5.0, epsilon = 1e-12);
    assert_relative_eq!(pos(&model, m).x, 4.0, epsilon = 1e-12);
    assert_relative_eq!(pos(&model, m).y, 4.5, epsilon = 1e-12);
}

#[test]
fn parallel_lines_hide_their_intersection_until_they_cross_again() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(10.0, 10.0));
    let c = model.add_point(Point2::new(0.0, 10.0));
    let d = model.add_point(Point2::new(10.0, 0.0));
    let ab = model.add_line(a, b).unwrap();
    let cd = model.add_line(c, d).unwrap();
    let x = model
        .add_intersection_point(ParentRef::Line(ab), ParentRef::Line(cd), Point2::new(5.0, 5.0))
        .unwrap();
    let start = pos(&model, x);

    // AB 与 CD 平行
    model.set_point_position(a, Point2::new(0.0, 20.0)).unwrap();
    let point = model.point(x).unwrap();
    assert!(point.is_hidden());
    assert!(!point.hidden);
    assert_eq!(point.position, start);

    model.set_point_position(a, Point2::new(0.0, 0.0)).unwrap();
    assert!(!model.point(x).unwrap().is_hidden());
    assert_relative_eq!(pos(&model, x).x, 5.0, epsilon = 1e-9);
    assert_relative_eq!(pos(&model, x).y, 5.0, epsilon = 1e-9);
}

#[test]
fn line_missing_circle_keeps_point_on_line_while_hidden() {
    let mut model = Model::new();
    let center = model.add_point(Point2::new(0.0, 0.0));
    let radius = model.add_point(Point2::new(5.0, 0.0));
    let circle = model.add_circle(center, radius).unwrap();
    let p = model.add_point(Point2::new(-10.0, 3.0));
    let q = model.add_point(Point2::new(10.0, 3.0));
    let line = model.add_line(p, q).unwrap();
    let x = model
        .add_intersection_point(ParentRef::Line(line), ParentRef::Circle(circle), Point2::new(4.0, 3.0))
        .unwrap();

    model.set_point_position(q, Point2::new(10.0, 13.0)).unwrap();
    assert!(model.point(x).unwrap().is_hidden());
    assert!(distance_to_line(&pos(&model, x), &pos(&model, p), &pos(&model, q)) < 1e-9);

    model.set_point_position(q, Point2::new(10.0, 3.0)).unwrap();
    assert!(!model.point(x).unwrap().is_hidden());
    let px = pos(&model, x);
    assert_relative_eq!(px.coords.norm(), 5.0, epsilon = 1e-9);
    assert_relative_eq!(px.y, 3.0, epsilon = 1e-9);
}

#[test]
fn disjoint_circles_hide_both_intersections() {
    let mut model = Model::new();
    let c1 = model.add_point(Point2::new(0.0, 0.0));
    let r1 = model.add_point(Point2::new(5.0, 0.0));
    let c2 = model.add_point(Point2::new(6.0, 0.0));
    let r2 = model.add_point(Point2::new(11.0, 0.0));
    let first = model.add_circle(c1, r1).unwrap();
    let second = model.add_circle(c2, r2).unwrap();
    let points = model
        .add_intersection_points(ParentRef::Circle(first), ParentRef::Circle(second))
        .unwrap();
    let before: Vec<Point2> = points.iter().map(|&id| pos(&model, id)).collect();

    // 半径点随圆心平移，圆心距 20
    model.set_point_position(c2, Point2::new(20.0, 0.0)).unwrap();
    for (&id, old) in points.iter().zip(&before) {
        assert!(model.point(id).unwrap().is_hidden());
        assert_eq!(pos(&model, id), *old);
    }

    model.set_point_position(c2, Point2::new(6.0, 0.0)).unwrap();
    for (&id, old) in points.iter().zip(&before) {
        assert!(!model.point(id).unwrap().is_hidden());
        assert_relative_eq!(pos(&model, id).x, old.x, epsilon = 1e-9);
        assert_relative_eq!(pos(&model, id).y, old.y, epsilon = 1e-9);
    }
}

#[test]
fn third_circle_circle_sibling_is_hidden() {
    let mut model = Model::new();
    let c1 = model.add_point(Point2::new(0.0, 0.0));
    let r1 = model.add_point(Point2::new(5.0, 0.0));
    let c2 = model.add_point(Point2::new(6.0, 0.0));
    let r2 = model.add_point(Point2::new(11.0, 0.0));
    let first = model.add_circle(c1, r1).unwrap();
    let second = model.add_circle(c2, r2).unwrap();
    let pair = model
        .add_intersection_points(ParentRef::Circle(first), ParentRef::Circle(second))
        .unwrap();
    let extra = model
        .add_intersection_point(ParentRef::Circle(first), ParentRef::Circle(second), Point2::new(3.0, 4.0))
        .unwrap();

    model.set_point_position(c2, Point2::new(6.2, 0.1)).unwrap();

    for &id in &pair {
        assert!(!model.point(id).unwrap().is_hidden());
        assert_relative_eq!((pos(&model, id) - pos(&model, c1)).norm(), 5.0, epsilon = 1e-6);
    }
    let point = model.point(extra).unwrap();
    assert!(point.is_hidden());
    assert!(!point.hidden);
}

#[test]
fn user_hidden_flag_survives_propagation() {
    let mut model = Model::new();
    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(4.0, 0.0));
    let m = model.add_midpoint(a, b).unwrap();
    model.set_hidden(EntityRef::Point(m), true).unwrap();

    model.set_point_position(b, Point2::new(6.0, 2.0)).unwrap();

    let point = model.point(m).unwrap();
    assert!(point.hidden);
    assert_eq!(point.position, Point2::new(3.0, 1.0));

    // 交点：父对象不相交再相交后，用户的隐藏仍然保留
    let c = model.add_point(Point2::new(0.0, 10.0));
    let d = model.add_point(Point2::new(10.0, 0.0));
    let e = model.add_point(Point2::new(10.0, 10.0));
    let ae = model.add_line(a, e).unwrap();
    let cd = model.add_line(c, d).unwrap();
    let x = model
        .add_intersection_point(ParentRef::Line(ae), ParentRef::Line(cd), Point2::new(5.0, 5.0))
        .unwrap();
    model.set_hidden(EntityRef::Point(x), true).unwrap();

    model.set_point_position(a, Point2::new(0.0, 20.0)).unwrap();
    assert!(model.point(x).unwrap().auto_hidden);
    model.set_point_position(a, Point2::new(0.0, 0.0)).unwrap();
    let point = model.point(x).unwrap();
    assert!(!point.auto_hidden);
    assert!(point.hidden);
}
