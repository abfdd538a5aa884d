use pathbind::v1::{Field, FieldValues, Record, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
}

impl Record for Person {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("first_name", |p: &Person| &p.first_name).path("firstName"),
            Field::new("last_name", |p: &Person| &p.last_name).path("lastName"),
            Field::new("age", |p: &Person| &p.age),
        ]
    }

    fn construct(values: &mut FieldValues) -> Result<Self> {
        Ok(Person {
            first_name: values.take("first_name")?,
            last_name: values.take("last_name")?,
            age: values.take_or("age", 0)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathbind::v1::{create, node, serialize};
    use serde_json::json;

    #[test]
    fn test_age_defaults_to_zero() {
        let person = create::<Person>(&json!({"firstName": "Ann", "lastName": "Lee"})).unwrap();
        assert_eq!(
            *person.borrow(),
            Person {
                first_name: "Ann".into(),
                last_name: "Lee".into(),
                age: 0,
            }
        );
        assert_eq!(
            serialize(&*person.borrow()).unwrap(),
            json!({"firstName": "Ann", "lastName": "Lee", "age": 0})
        );
    }

    #[test]
    fn test_round_trip() {
        let original = node(Person {
            first_name: "Bo".into(),
            last_name: "Ng".into(),
            age: 41,
        });
        let tree = serialize(&*original.borrow()).unwrap();
        let rebuilt = create::<Person>(&tree).unwrap();
        assert_eq!(*rebuilt.borrow(), *original.borrow());
    }

    #[test]
    fn test_wrong_type_names_field() {
        let err = create::<Person>(&json!({"firstName": 1, "lastName": "Lee"})).unwrap_err();
        assert!(err.to_string().starts_with("Person.first_name:"));
    }
}
