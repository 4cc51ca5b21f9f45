//! Access and egress walks to the requested coordinates.

use tracing::debug;

use crate::domain::{Itinerary, Leg, Place};
use crate::fare::FarePolicy;
use crate::repository::TransferEdgeStore;
use crate::walking::PedestrianRouter;

use super::RefineContext;
use crate::planner::legs::WalkResolver;

fn is_coordinate(place: &Place) -> bool {
    matches!(place, Place::Coordinate { .. })
}

/// Access and egress pairs for every itinerary not yet bookended.
pub(super) fn bookend_walks<'i, F: FarePolicy + ?Sized>(
    context: &RefineContext<'_, F>,
    itineraries: impl IntoIterator<Item = &'i Itinerary>,
) -> Vec<(Place, Place)> {
    let origin = Place::coordinate(context.origin);
    let destination = Place::coordinate(context.destination);

    let mut pairs = Vec::new();
    for itinerary in itineraries {
        if !is_coordinate(itinerary.origin()) {
            pairs.push((origin.clone(), itinerary.origin().clone()));
        }
        if !is_coordinate(itinerary.destination()) {
            pairs.push((itinerary.destination().clone(), destination.clone()));
        }
    }
    pairs
}

/// Prepend the access walk and append the egress walk.
///
/// Returns `None` when either walk is longer than `max_access_walk_m`, alone
/// or once merged with a walk the itinerary already starts or ends with;
/// such an itinerary is dropped, not truncated.
pub(super) fn bookend<F, P, S>(
    context: &RefineContext<'_, F>,
    walks: &WalkResolver<'_, P, S>,
    itinerary: Itinerary,
) -> Option<Itinerary>
where
    F: FarePolicy + ?Sized,
    P: PedestrianRouter,
    S: TransferEdgeStore + ?Sized,
{
    let cap = context.config().max_access_walk_m;

    let access = (!is_coordinate(itinerary.origin()))
        .then(|| walks.walk(&Place::coordinate(context.origin), itinerary.origin()));
    let egress = (!is_coordinate(itinerary.destination()))
        .then(|| walks.walk(itinerary.destination(), &Place::coordinate(context.destination)));

    for (which, walk) in [("access", &access), ("egress", &egress)] {
        if let Some(walk) = walk {
            if walk.distance_m > cap {
                debug!(which, distance_m = walk.distance_m, cap, "dropping itinerary with a long walk");
                return None;
            }
        }
    }

    let mut legs = Vec::with_capacity(itinerary.legs().len() + 2);
    legs.extend(access.map(Leg::Walk));
    legs.extend(itinerary.into_legs());
    legs.extend(egress.map(Leg::Walk));
    let bookended = Itinerary::new(legs).ok()?;

    let ends = [("access", bookended.legs().first()), ("egress", bookended.legs().last())];
    for (which, leg) in ends {
        if let Some(Leg::Walk(walk)) = leg {
            if walk.distance_m > cap {
                debug!(which, distance_m = walk.distance_m, cap, "merged walk too long, dropping");
                return None;
            }
        }
    }
    Some(bookended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Point;
    use crate::fare::BandedFarePolicy;
    use crate::planner::config::PlannerConfig;
    use crate::planner::legs::LegBuilder;
    use crate::planner::refine::tests::{build, builder, modes, resolver, ride, walk};
    use crate::planner::testkit::{Fixture, pt};

    fn fixture() -> Fixture {
        let mut f = Fixture::new();
        f.stop("A", -1.3000, 36.8000)
            .stop("B", -1.3000, 36.8300)
            .route("R1", "Op", "1", &["A", "B"]);
        f
    }

    fn context<'a>(
        legs: &'a LegBuilder<'a, BandedFarePolicy>,
        origin: Point,
        destination: Point,
    ) -> RefineContext<'a, BandedFarePolicy> {
        RefineContext {
            legs,
            origin,
            destination,
            preferred_operators: &[],
        }
    }

    #[test]
    fn adds_walks_at_both_ends() {
        let f = fixture();
        let net = f.network();
        let repo = f.repository();
        let config = PlannerConfig::default();
        let fares = BandedFarePolicy::default();
        let legs = builder(&net, &config, &fares);
        let walks = resolver(&net, &config, &repo);
        let ctx = context(&legs, pt(-1.3018, 36.8000), pt(-1.3000, 36.8318));

        let itinerary = build(&legs, &walks, vec![ride(0, 0, 1)]);
        assert_eq!(bookend_walks(&ctx, std::slice::from_ref(&itinerary)).len(), 2);

        let bookended = bookend(&ctx, &walks, itinerary).unwrap();
        assert_eq!(modes(&bookended), vec!["walk", "bus", "walk"]);
        assert!(bookended.origin().same_as(&Place::coordinate(pt(-1.3018, 36.8000))));
        assert!(bookended.destination().same_as(&Place::coordinate(pt(-1.3000, 36.8318))));
        for walk in bookended.walk_legs() {
            assert!(walk.distance_m <= config.max_access_walk_m);
        }
    }

    #[test]
    fn long_access_walk_drops_itinerary() {
        let f = fixture();
        let net = f.network();
        let repo = f.repository();
        let config = PlannerConfig::default();
        let fares = BandedFarePolicy::default();
        let legs = builder(&net, &config, &fares);
        let walks = resolver(&net, &config, &repo);
        // About 2 km south of A
        let ctx = context(&legs, pt(-1.3180, 36.8000), pt(-1.3000, 36.8300));

        let itinerary = build(&legs, &walks, vec![ride(0, 0, 1)]);
        assert!(bookend(&ctx, &walks, itinerary).is_none());
    }

    #[test]
    fn bookending_twice_changes_nothing() {
        let f = fixture();
        let net = f.network();
        let repo = f.repository();
        let config = PlannerConfig::default();
        let fares = BandedFarePolicy::default();
        let legs = builder(&net, &config, &fares);
        let walks = resolver(&net, &config, &repo);
        let ctx = context(&legs, pt(-1.3010, 36.8000), pt(-1.3010, 36.8300));

        let once = bookend(&ctx, &walks, build(&legs, &walks, vec![ride(0, 0, 1)])).unwrap();
        assert!(bookend_walks(&ctx, std::slice::from_ref(&once)).is_empty());
        let twice = bookend(&ctx, &walks, once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn walk_merged_into_access_counts_toward_cap() {
        let mut f = fixture();
        f.stop("W", -1.3000, 36.7960);
        let net = f.network();
        let repo = f.repository();
        let config = PlannerConfig::default();
        let fares = BandedFarePolicy::default();
        let legs = builder(&net, &config, &fares);
        let walks = resolver(&net, &config, &repo);
        // About 1.1 km west of W, itself about 450 m west of A
        let ctx = context(&legs, pt(-1.3000, 36.7861), pt(-1.3000, 36.8300));

        let itinerary = build(&legs, &walks, vec![walk("W", "A"), ride(0, 0, 1)]);
        let access = walks.walk(&Place::coordinate(ctx.origin), itinerary.origin());
        assert!(access.distance_m <= config.max_access_walk_m);

        assert!(bookend(&ctx, &walks, itinerary).is_none());
    }
}
