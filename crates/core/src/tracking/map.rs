use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::json;

use super::{TrackingSession, TrackingSnapshot};

/// Where a map view should look.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapFocus {
    pub center: Point,
    pub zoom: u8,
}

fn feature(geometry: Value, kind: &str) -> Feature {
    let mut feature = Feature::from(Geometry::new(geometry));
    feature.set_property("kind", kind);
    feature
}

fn trail(points: Vec<Point>, kind: &str) -> Option<Feature> {
    // A single vertex is not a line.
    (points.len() >= 2).then(|| {
        let coords = points.into_iter().map(|p| vec![p.x(), p.y()]).collect();
        feature(Value::LineString(coords), kind)
    })
}

fn marker(point: Point, kind: &str) -> Feature {
    feature(Value::from(&point), kind)
}

pub(super) fn trip_features(session: &TrackingSession, snapshot: &TrackingSnapshot) -> FeatureCollection {
    let schedule = session.schedule();
    let (origin, destination) = session.endpoints();
    let (traveled, remaining) = session.estimator().route().split_at(snapshot.traveled_km);

    let mut features: Vec<Feature> = [trail(traveled, "traveled"), trail(remaining, "remaining")]
        .into_iter()
        .flatten()
        .collect();

    let mut origin = marker(origin, "origin");
    origin.set_property("name", schedule.origin.as_ref());
    let mut destination = marker(destination, "destination");
    destination.set_property("name", schedule.destination.as_ref());

    let mut bus = marker(snapshot.position, "bus");
    bus.set_property("traveled_km", snapshot.traveled_km);
    bus.set_property("remaining_km", snapshot.remaining_km);
    bus.set_property("arrived", snapshot.arrived);
    bus.set_property("velocity_kmh", snapshot.velocity_kmh);
    bus.set_property(
        "estimated_arrival",
        json!(snapshot.estimated_arrival.format("%Y-%m-%dT%H:%M:%S").to_string()),
    );

    features.extend([origin, destination, bus]);

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
