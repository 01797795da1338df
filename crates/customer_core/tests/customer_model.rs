use customer_core::{Customer, CustomerValidationError};
use serde_json::json;

#[test]
fn customer_new_is_unpersisted() {
    let customer = Customer::new("John", "john@gmail.com");

    assert_eq!(customer.id, 0);
    assert_eq!(customer.name, "John");
    assert_eq!(customer.email, "john@gmail.com");
    assert!(!customer.is_persisted());
}

#[test]
fn customer_serialization_uses_expected_wire_fields() {
    let customer = Customer {
        id: 7,
        name: "Henry".to_string(),
        email: "henry@gmail.com".to_string(),
    };

    let value = serde_json::to_value(&customer).expect("customer should serialize");
    assert_eq!(
        value,
        json!({ "id": 7, "name": "Henry", "email": "henry@gmail.com" })
    );

    let decoded: Customer = serde_json::from_value(value).expect("customer should deserialize");
    assert_eq!(decoded, customer);
}

#[test]
fn validation_errors_have_readable_messages() {
    assert_eq!(
        CustomerValidationError::EmptyName.to_string(),
        "customer name must not be empty"
    );
    assert_eq!(
        Customer::new("Ann", "\t").validate(),
        Err(CustomerValidationError::EmptyEmail)
    );
}
