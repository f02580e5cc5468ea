//! Basic usage of the `ring_pool` crate:
//!
//! * Creating a pool.
//! * Checking out items until the pool is exhausted.
//! * Releasing items, explicitly and by dropping the handle.
//! * Resetting the pool.

use ring_pool::Pool;

fn main() -> Result<(), ring_pool::Error> {
    let mut pool = Pool::builder()
        .capacity(3)
        .name("greetings")
        .build_with(|_| String::new())?;

    println!("Created {pool}");

    let mut alice = pool.get().expect("fresh pool has free items");
    let mut bob = pool.get().expect("fresh pool has free items");
    let charlie = pool.get().expect("fresh pool has free items");

    alice.push_str("Hello, Alice");
    bob.push_str("Hello, Bob");

    println!("After three checkouts: {pool}");

    // The pool never grows - once everything is checked out, you get nothing.
    assert!(pool.get().is_none());

    pool.put(alice);
    drop(bob);

    // Items are not cleared between uses - this one still greets Alice.
    let reused = pool.get().expect("we just released two items");
    println!("Reused item #{} still contains: {}", reused.index(), *reused);

    drop(reused);
    drop(charlie);

    // Resetting needs exclusive access, so it can only happen when nothing is checked out.
    pool.reset();
    println!("After reset: {pool}");

    Ok(())
}
