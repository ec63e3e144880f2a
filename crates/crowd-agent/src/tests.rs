//! Unit tests for crowd-agent.

#[cfg(test)]
mod slots {
    use glam::Vec3;

    use crowd_core::CrowdError;

    use crate::{AgentParams, AgentStore};

    #[test]
    fn add_and_resolve() {
        let mut store = AgentStore::new();
        let h = store.add(Vec3::new(1.0, 0.0, 2.0), AgentParams::default());
        let i = store.resolve(h).unwrap();
        assert_eq!(store.position[i], Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn remove_invalidates_handle() {
        let mut store = AgentStore::new();
        let h = store.add(Vec3::ZERO, AgentParams::default());
        store.remove(h).unwrap();
        assert!(matches!(store.resolve(h), Err(CrowdError::StaleHandle(_))));
        // Double remove is also rejected.
        assert!(store.remove(h).is_err());
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn recycled_slot_rejects_old_handle() {
        let mut store = AgentStore::new();
        let old = store.add(Vec3::ZERO, AgentParams::default());
        store.remove(old).unwrap();

        // The new agent reuses slot 0 with a bumped generation.
        let new = store.add(Vec3::X, AgentParams::default());
        assert_eq!(new.index, old.index);
        assert_ne!(new.generation, old.generation);

        assert!(store.resolve(old).is_err(), "stale handle must not resolve");
        assert_eq!(store.resolve(new).unwrap(), 0);
    }

    #[test]
    fn live_indices_skip_dead_slots() {
        let mut store = AgentStore::new();
        let a = store.add(Vec3::ZERO, AgentParams::default());
        let b = store.add(Vec3::X, AgentParams::default());
        let c = store.add(Vec3::Y, AgentParams::default());
        store.remove(b).unwrap();

        let live: Vec<usize> = store.live_indices().collect();
        assert_eq!(live, vec![0, 2]);
        let _ = (a, c);
    }

    #[test]
    fn desired_speed_clamped_to_max() {
        let mut store = AgentStore::new();
        let params = AgentParams {
            max_speed: 2.0,
            desired_speed: 5.0,
            ..AgentParams::default()
        };
        let h = store.add(Vec3::ZERO, params);
        let i = store.resolve(h).unwrap();
        assert_eq!(store.desired_speed[i], 2.0);
    }

    #[test]
    fn new_agent_has_no_end_of_path() {
        let mut store = AgentStore::new();
        let h = store.add(Vec3::ZERO, AgentParams::default());
        let i = store.resolve(h).unwrap();
        assert!(!store.has_end_of_path(i));
        store.end_of_path[i] = Vec3::new(3.0, 0.0, 1.0);
        assert!(store.has_end_of_path(i));
    }

    #[test]
    fn recycled_slot_state_is_reset() {
        let mut store = AgentStore::new();
        let old = store.add(Vec3::ZERO, AgentParams::default());
        {
            let i = store.resolve(old).unwrap();
            store.collision_normal[i] = Vec3::Y;
            store.manually_controlled[i] = true;
            store.output.speed[i] = 1.5;
        }
        store.remove(old).unwrap();
        let new = store.add(Vec3::X, AgentParams::default());
        let i = store.resolve(new).unwrap();
        assert_eq!(store.collision_normal[i], Vec3::ZERO);
        assert!(!store.manually_controlled[i]);
        assert_eq!(store.output.speed[i], 0.0);
        // Fresh agents target their own position (zero effective motion).
        assert_eq!(store.output.target_point[i], Vec3::X);
    }
}
