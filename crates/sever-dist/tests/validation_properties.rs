use sever_dist::{Mixture, MixtureComponent, Registry};

#[test]
fn testable_property_8_validation_failure_modes() {
    let reg = Registry::new();

    // unknown parameter name -> unknown distribution entirely
    assert!(!reg.validate("not_a_distribution", &[1.0]));

    // integer-only parameter supplied with fractional value
    let mut custom = Registry::new();
    custom.create_example_distributions();
    assert!(!custom.validate("beta_binomial", &[5.5, 1.0, 1.0]));

    // value outside [min, max]
    assert!(!reg.validate("bernoulli", &[2.0]));

    // negative value when positive-only
    assert!(!reg.validate("exponential", &[-1.0]));
}

#[test]
fn mixture_construction_end_to_end_with_registry_lookup() {
    let mut registry = Registry::new();
    registry.create_example_distributions();

    let mixture = Mixture::new(vec![
        MixtureComponent::new("normal", 0.6),
        MixtureComponent::new("student_t", 0.4),
    ])
    .expect("weights sum to one");

    for component in mixture.components() {
        assert!(registry.has(&component.distribution_name));
    }
}
