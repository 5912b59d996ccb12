#![no_main]
use libfuzzer_sys::fuzz_target;
use savetrack::{Game, Listener, ListenerRegistry, MemorySettings, Reconciler};

fuzz_target!(|data: &[u8]| {
    let reconciler = Reconciler::new(Game::Siu);
    let registry = ListenerRegistry::new(MemorySettings::new(), Game::Siu.id());
    registry.register("DLC2_Complete:PipeCap12_2", Listener::new(|_, _| {}));
    registry.register("PlayerCoins", Listener::new(|_, _| {}));

    // compared through debug output as stored floats may be NaN
    let snapshot = |registry: &ListenerRegistry<MemorySettings>| format!("{:?}", registry.values());

    let before = snapshot(&registry);
    if registry.load(data, &reconciler).is_err() {
        // a rejected load changes nothing
        assert_eq!(snapshot(&registry), before);
        return;
    }

    // loading the same bytes again is idempotent
    let first = snapshot(&registry);
    registry.load(data, &reconciler).unwrap();
    assert_eq!(snapshot(&registry), first);
});
