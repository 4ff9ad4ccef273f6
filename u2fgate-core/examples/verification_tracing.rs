//! Example demonstrating the verification engine's tracing instrumentation.
//!
//! Run with: cargo run -p u2fgate-core --example verification_tracing

use tracing_subscriber::{fmt, EnvFilter};
use u2fgate_core::{
    AppId, FailureKind, MockVerifier, RegisterResponse, SignResponse, U2fService,
};

fn main() {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("u2fgate_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== U2F Verification Tracing Demo ===\n");

    let app_id = match AppId::new("https://login.example.invalid") {
        Ok(app_id) => app_id,
        Err(e) => {
            eprintln!("Invalid AppId: {}", e);
            return;
        }
    };

    // The mock accepts registrations and reports a stale counter on sign-in
    let verifier =
        MockVerifier::new(app_id.as_str()).fail_authentication(FailureKind::CounterTooLow);
    let service = match U2fService::new(verifier) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Invalid verifier: {}", e);
            return;
        }
    };

    println!("\nRegistering a device...\n");

    let registration = match service
        .request_registration()
        .and_then(|request| service.verify_registration(&request, &RegisterResponse::default()))
    {
        Ok(result) if result.was_successful() => {
            println!("\n✅ {}", result);
            result.into_registration()
        }
        Ok(result) => {
            println!("\n❌ {}", result);
            return;
        }
        Err(e) => {
            println!("\n❌ Failed: {}", e);
            return;
        }
    };

    println!("\nAuthenticating with a cloned device...\n");

    match service
        .request_authentication(&registration)
        .and_then(|request| {
            service.verify_authentication(&registration, &request, &SignResponse::default())
        }) {
        Ok(result) => println!("\n❌ {} ({})", result, result.status()),
        Err(e) => println!("\n❌ Failed: {}", e),
    }

    println!(
        "\nVerifier calls: {} registration, {} authentication",
        service.verifier().registration_calls(),
        service.verifier().authentication_calls()
    );
}
