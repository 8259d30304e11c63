//! Per-agent movement state.

use sa_core::{Coordinate, TravelProfile};

/// The movement state for a single agent.
///
/// The agent follows `route` waypoint by waypoint; `route_cursor` indexes
/// the waypoint currently being approached.  `route_cursor == route.len()`
/// means the route is exhausted (or absent) and must be refreshed before
/// route-following resumes.
///
/// `pending_target` is a user-supplied goal and always takes priority over
/// `destination`, which is whatever the last route request aimed for.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementState {
    /// Where the agent is now.
    pub current_position: Coordinate,

    /// Waypoints of the active route, in travel order.  May be empty.
    pub route: Vec<Coordinate>,

    /// Index of the next waypoint to reach.  Always `<= route.len()`.
    pub route_cursor: usize,

    /// User-set goal, cleared on arrival (within 10 m).
    pub pending_target: Option<Coordinate>,

    /// Goal of the most recent route request.
    pub destination: Option<Coordinate>,

    /// Metres per second.  Always positive and finite.
    pub speed_mps: f64,

    pub profile: TravelProfile,
}

impl MovementState {
    /// Fresh state at `position` with no route and no goals.
    pub fn new(position: Coordinate, speed_mps: f64, profile: TravelProfile) -> Self {
        Self {
            current_position: position,
            route:            Vec::new(),
            route_cursor:     0,
            pending_target:   None,
            destination:      None,
            speed_mps,
            profile,
        }
    }

    /// `true` while the cursor points at a waypoint still to be reached.
    #[inline]
    pub fn has_active_route(&self) -> bool {
        self.route_cursor < self.route.len()
    }

    /// `true` once every waypoint has been consumed.
    #[inline]
    pub fn is_route_exhausted(&self) -> bool {
        !self.has_active_route()
    }

    /// The waypoint being approached, if any.
    #[inline]
    pub fn current_waypoint(&self) -> Option<Coordinate> {
        self.route.get(self.route_cursor).copied()
    }

    /// Waypoints still ahead, including the current one.
    pub fn remaining_waypoints(&self) -> &[Coordinate] {
        &self.route[self.route_cursor.min(self.route.len())..]
    }

    /// Install a freshly fetched route, starting from its first waypoint.
    pub(crate) fn install_route(&mut self, route: Vec<Coordinate>) {
        self.route = route;
        self.route_cursor = 0;
    }

    /// Drop the active route without touching goals.
    pub(crate) fn clear_route(&mut self) {
        self.route.clear();
        self.route_cursor = 0;
    }
}
