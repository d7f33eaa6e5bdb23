use geo::{Area, BoundingRect};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, Point, Rect,
    polygon,
};

use vt_imagemap::clip::clip_to_area;

fn area() -> Rect<f64> {
    Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 })
}

#[test]
fn contained_geometry_passes_through() {
    let line = Geometry::LineString(LineString::from(vec![(0.1, 0.1), (0.9, 0.9)]));
    assert_eq!(clip_to_area(&line, &area()), Some(line));
}

#[test]
fn disjoint_geometry_is_dropped() {
    let point = Geometry::Point(Point::new(2.0, 2.0));
    assert_eq!(clip_to_area(&point, &area()), None);
    let line = Geometry::LineString(LineString::from(vec![(2.0, 0.0), (3.0, 1.0)]));
    assert_eq!(clip_to_area(&line, &area()), None);
}

#[test]
fn crossing_line_is_cut_at_the_edge() {
    let line = Geometry::LineString(LineString::from(vec![(-1.0, 0.5), (2.0, 0.5)]));
    let clipped = clip_to_area(&line, &area()).expect("clipped");
    let Geometry::LineString(clipped) = clipped else {
        panic!("expected a single line, got {clipped:?}");
    };
    let bounds = clipped.bounding_rect().expect("bounds");
    assert!((bounds.min().x - 0.0).abs() < 1e-9);
    assert!((bounds.max().x - 1.0).abs() < 1e-9);
}

#[test]
fn line_leaving_and_reentering_splits() {
    let line = Geometry::LineString(LineString::from(vec![(0.2, 0.5), (0.5, 2.0), (0.8, 0.5)]));
    let clipped = clip_to_area(&line, &area()).expect("clipped");
    assert!(matches!(clipped, Geometry::MultiLineString(ref lines) if lines.0.len() == 2));
}

#[test]
fn overlapping_polygon_is_intersected() {
    let square = Geometry::Polygon(polygon![
        (x: 0.5, y: 0.5),
        (x: 1.5, y: 0.5),
        (x: 1.5, y: 1.5),
        (x: 0.5, y: 1.5),
    ]);
    let clipped = clip_to_area(&square, &area()).expect("clipped");
    let Geometry::Polygon(clipped) = clipped else {
        panic!("expected a polygon, got {clipped:?}");
    };
    assert!((clipped.unsigned_area() - 0.25).abs() < 1e-9);
}

#[test]
fn multi_point_keeps_inside_members() {
    let points = Geometry::MultiPoint(MultiPoint::new(vec![
        Point::new(0.5, 0.5),
        Point::new(1.5, 0.5),
        Point::new(0.25, 0.25),
    ]));
    let clipped = clip_to_area(&points, &area()).expect("clipped");
    assert_eq!(
        clipped,
        Geometry::MultiPoint(MultiPoint::new(vec![Point::new(0.5, 0.5), Point::new(0.25, 0.25)]))
    );
}

#[test]
fn collection_drops_members_outside() {
    let collection = Geometry::GeometryCollection(GeometryCollection::from(vec![
        Geometry::Point(Point::new(0.5, 0.5)),
        Geometry::Point(Point::new(5.0, 5.0)),
        Geometry::MultiLineString(MultiLineString::new(vec![LineString::from(vec![
            (-1.0, 0.5),
            (0.5, 0.5),
        ])])),
    ]));
    let clipped = clip_to_area(&collection, &area()).expect("clipped");
    let Geometry::GeometryCollection(members) = clipped else {
        panic!("expected a collection");
    };
    assert_eq!(members.0.len(), 2);
    assert_eq!(members.0[0], Geometry::Point(Point::new(0.5, 0.5)));
}

#[test]
fn non_finite_geometry_is_left_unclipped() {
    let line = Geometry::LineString(LineString::from(vec![(0.5, 0.5), (f64::INFINITY, 0.5)]));
    assert_eq!(clip_to_area(&line, &area()), Some(line));
}
