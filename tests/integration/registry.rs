#![allow(missing_docs)]

mod common;

use std::sync::Arc;
use std::thread;

use common::{recording_database, registry, test_config, Counter, Document, Employee, UserAccount};
use tessera::{
    id::DEFAULT_EPOCH, IdGenerator, IdStrategy, ModelRegistry, SnowflakeGenerator, Value,
};

#[test]
fn descriptors_are_built_once() {
    let registry = registry();
    assert!(registry.is_empty());
    assert!(!registry.is_registered::<UserAccount>());

    let first = registry.descriptor::<UserAccount>();
    let second = registry.register::<UserAccount>();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(registry.is_registered::<UserAccount>());
    assert_eq!(registry.len(), 1);
    assert!(first.type_name().ends_with("UserAccount"));
}

#[test]
fn concurrent_registration_shares_one_descriptor() {
    let registry = registry();
    let models: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.descriptor::<Employee>()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(models.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(registry.len(), 1);
}

#[test]
fn inherited_fields_follow_subtype_fields() {
    let registry = registry();
    let model = registry.descriptor::<Employee>();
    let properties: Vec<_> = model.fields().iter().map(|f| f.property.as_str()).collect();
    assert_eq!(properties, ["name", "department", "id", "createdAt"]);
    let columns: Vec<_> = model.fields().iter().map(|f| f.column.as_str()).collect();
    assert_eq!(columns, ["name", "department", "id", "created_at"]);
    assert_eq!(model.id_field().unwrap().property, "id");
    assert_eq!(
        model.id_strategy(),
        IdStrategy::Snowflake {
            begin_time_millis: DEFAULT_EPOCH
        }
    );
}

#[test]
fn strategies_resolve_per_type() {
    let registry = registry();

    let counter = registry.descriptor::<Counter>();
    assert_eq!(counter.id_strategy(), IdStrategy::None);
    assert!(counter.auto_id());
    assert!(!counter.id_field().unwrap().insertable);

    let document = registry.descriptor::<Document>();
    assert_eq!(document.id_strategy(), IdStrategy::RandomHex);
    assert!(matches!(document.id_generator(), Some(IdGenerator::RandomHex)));
}

#[test]
fn configured_epoch_overrides_every_type() {
    let mut config = test_config();
    config.snowflake.epoch_override = Some(1_700_000_000_000);
    let registry = ModelRegistry::new(config).unwrap();
    assert_eq!(
        registry.descriptor::<UserAccount>().id_strategy(),
        IdStrategy::Snowflake {
            begin_time_millis: 1_700_000_000_000
        }
    );
}

#[test]
fn snowflake_keys_come_from_the_injected_clock() {
    let now = DEFAULT_EPOCH + 86_400_000;
    let registry = ModelRegistry::with_clock(test_config(), Arc::new(move || now)).unwrap();
    let model = registry.descriptor::<UserAccount>();

    let mut a = UserAccount::default();
    let mut b = UserAccount::default();
    assert!(model.fill_id_if_absent(&mut a).unwrap());
    assert!(model.fill_id_if_absent(&mut b).unwrap());
    assert!(!model.fill_id_if_absent(&mut b).unwrap());

    let (a, b) = (a.id.unwrap(), b.id.unwrap());
    assert!(b > a);
    let decoder = SnowflakeGenerator::new(DEFAULT_EPOCH, registry.generators().node());
    assert_eq!(decoder.extract_timestamp(a), now);
    assert_eq!(SnowflakeGenerator::extract_sequence(b), SnowflakeGenerator::extract_sequence(a) + 1);
    let node = SnowflakeGenerator::extract_node(a);
    assert_eq!((node.datacenter(), node.worker()), (1, 1));
}

#[test]
fn accessor_names_resolve_to_properties() {
    let registry = registry();
    assert_eq!(&*registry.property_of(UserAccount::USER_NAME), "userName");
    assert_eq!(&*registry.property_of(UserAccount::ID), "id");
    assert_eq!(&*registry.property_of(UserAccount::USER_NAME), "userName");
    assert_eq!(registry.accessors().len(), 2);
}

#[test]
fn statements_compile_once_per_shape() {
    let (db, _executor) = recording_database();
    let users = db.mapper::<UserAccount>();

    users.find_by_id(1).unwrap();
    users.find_by_id(2).unwrap();
    users.delete_by_id(3).unwrap();
    let stats = db.registry().statements().stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.fixed_entries, 2);

    let filter = UserAccount::with_status("active");
    users.list_by_condition(&filter, &[UserAccount::STATUS.asc()]).unwrap();
    users.list_by_condition(&filter, &[UserAccount::STATUS.asc()]).unwrap();
    users.list_by_condition(&filter, &[UserAccount::STATUS.desc()]).unwrap();
    let stats = db.registry().statements().stats();
    assert_eq!(stats.varying_entries, 2);
}

#[test]
fn registries_are_isolated() {
    let one = registry();
    let two = registry();
    one.descriptor::<UserAccount>();
    assert!(one.is_registered::<UserAccount>());
    assert!(!two.is_registered::<UserAccount>());

    let model = two.descriptor::<Document>();
    let doc = Document {
        id: Some("abc".into()),
        title: None,
    };
    assert_eq!(model.id_value(&doc).unwrap(), Value::from("abc"));
}
