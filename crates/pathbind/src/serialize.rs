//! Writing object graphs back out as trees.

use crate::error::Result;
use crate::navigator;
use crate::record::Record;
use crate::registry::registry;
use crate::slot::{ElementType, Slot, map_leaves};
use serde_json::{Map, Value};

/// Serialize `record` into a tree.
///
/// Direct fields are written first, then computed getters, each at its path.
/// Back-references are skipped, so cycles through parents terminate.
pub fn serialize<T: Record>(record: &T) -> Result<Value> {
    let registry = registry::<T>()?;
    let mut tree = Value::Object(Map::new());

    for field in registry.fields().iter().filter(|f| !f.is_parent_ref()) {
        let slot = map_leaves(field.read(record), field.element_type(), &mut serialize_leaf)?;
        navigator::set(&mut tree, field.path_str(), slot.into_tree())?;
    }

    for computed in registry.computed() {
        let slot = map_leaves(
            computed.read(record),
            computed.element_type(),
            &mut serialize_leaf,
        )?;
        navigator::set(&mut tree, computed.path_str(), slot.into_tree())?;
    }

    Ok(record.post_serialize(tree))
}

fn serialize_leaf(slot: Slot, _element: &ElementType) -> Result<Slot> {
    match slot {
        Slot::Node(node) => node.serialize().map(Slot::Value),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::create;
    use crate::node::{Node, Parent, node};
    use crate::record::{Computed, Field, FieldValues};
    use serde_json::json;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Album {
        title: String,
        tracks: Vec<Node<Track>>,
        sides: Vec<Vec<Node<Track>>>,
        cover: Option<Node<Track>>,
    }

    impl Record for Album {
        fn fields() -> Vec<Field<Self>> {
            vec![
                Field::new("title", |a: &Album| &a.title).path("info.title"),
                Field::new("tracks", |a: &Album| &a.tracks),
                Field::new("sides", |a: &Album| &a.sides),
                Field::new("cover", |a: &Album| &a.cover),
            ]
        }

        fn computed() -> Vec<Computed<Self>> {
            vec![Computed::read_only("length", |a: &Album| a.tracks.len()).path("info.length")]
        }

        fn construct(values: &mut FieldValues) -> Result<Self> {
            Ok(Album {
                title: values.take("title")?,
                tracks: values.take_or_default("tracks")?,
                sides: values.take_or_default("sides")?,
                cover: values.take("cover")?,
            })
        }

        fn post_serialize(&self, mut tree: Value) -> Value {
            if self.cover.is_none() {
                if let Some(map) = tree.as_object_mut() {
                    map.remove("cover");
                }
            }
            tree
        }
    }

    #[derive(Debug, Default)]
    struct Track {
        name: String,
        album: Parent<Album>,
    }

    impl Record for Track {
        fn fields() -> Vec<Field<Self>> {
            vec![
                Field::new("name", |t: &Track| &t.name),
                Field::new("album", |t: &Track| &t.album),
            ]
        }

        fn construct(values: &mut FieldValues) -> Result<Self> {
            Ok(Track {
                name: values.take("name")?,
                album: values.take("album")?,
            })
        }
    }

    #[test]
    fn test_serialize_nested_graph() {
        let tree = json!({
            "info": {"title": "Blue"},
            "tracks": [{"name": "one"}, {"name": "two"}],
            "sides": [[{"name": "a1"}], [{"name": "b1"}, {"name": "b2"}]]
        });
        let album = create::<Album>(&tree).unwrap();
        assert_eq!(
            serialize(&*album.borrow()).unwrap(),
            json!({
                "info": {"title": "Blue", "length": 2},
                "tracks": [{"name": "one"}, {"name": "two"}],
                "sides": [[{"name": "a1"}], [{"name": "b1"}, {"name": "b2"}]]
            })
        );
    }

    #[test]
    fn test_parent_refs_never_serialized() {
        let album = node(Album {
            title: "Red".into(),
            ..Album::default()
        });
        let track = node(Track {
            name: "solo".into(),
            album: Parent::from(&album),
        });
        album.borrow_mut().tracks.push(Rc::clone(&track));

        let out = serialize(&*track.borrow()).unwrap();
        assert_eq!(out, json!({"name": "solo"}));

        let out = serialize(&*album.borrow()).unwrap();
        assert_eq!(out["tracks"], json!([{"name": "solo"}]));
    }

    #[test]
    fn test_serialize_default_record() {
        let track = Track::default();
        assert_eq!(serialize(&track).unwrap(), json!({"name": ""}));
    }

    #[test]
    fn test_post_serialize_hook_applied() {
        let album = Album {
            title: "Green".into(),
            ..Album::default()
        };
        let out = serialize(&album).unwrap();
        assert!(out.get("cover").is_none());

        let album = Album {
            cover: Some(node(Track {
                name: "art".into(),
                album: Parent::default(),
            })),
            ..album
        };
        assert_eq!(serialize(&album).unwrap()["cover"], json!({"name": "art"}));
    }

    #[test]
    fn test_round_trip() {
        let tree = json!({
            "info": {"title": "Kind", "length": 1},
            "tracks": [{"name": "so what"}],
            "sides": [],
            "cover": null
        });
        let album = create::<Album>(&tree).unwrap();
        let out = serialize(&*album.borrow()).unwrap();
        let again = create::<Album>(&out).unwrap();
        assert_eq!(serialize(&*again.borrow()).unwrap(), out);
        assert_eq!(again.borrow().tracks[0].borrow().name, "so what");
    }
}
