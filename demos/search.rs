use offer_search::{
    AdvancedSearch, Column, Event, FieldResolver, MemoryStore, Operator, ResolutionError,
    SearchConfig,
};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

struct Offer {
    ship: &'static str,
    category: &'static str,
    port: Option<&'static str>,
}

struct Offers;

impl FieldResolver<Offer> for Offers {
    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("favorite", "Favorite"),
            Column::new("ship", "Ship"),
            Column::new("category", "Category"),
            Column::new("departurePort", "Departure Port"),
        ]
    }

    fn resolve(&self, offer: &Offer, field_key: &str) -> Result<Option<String>, ResolutionError> {
        match field_key {
            "ship" => Ok(Some(offer.ship.to_owned())),
            "category" => Ok(Some(offer.category.to_owned())),
            "departurePort" => Ok(offer.port.map(str::to_owned)),
            "favorite" => Ok(None),
            _ => Err(ResolutionError::new(field_key, "unknown column")),
        }
    }
}

const OFFERS: [Offer; 6] = [
    Offer { ship: "Icon of the Seas", category: "Suite", port: Some("Miami") },
    Offer { ship: "Wonder of the Seas", category: "Interior", port: Some("Port Canaveral") },
    Offer { ship: "Icon of the Seas", category: "Junior Suite", port: Some("Miami") },
    Offer { ship: "Star of the Seas", category: "Balcony", port: None },
    Offer { ship: "Wonder of the Seas", category: "Suite", port: Some("Port Canaveral") },
    Offer { ship: "Oasis of the Seas", category: "Ocean View", port: Some("Galveston") },
];

fn print(title: &str, rows: &[&Offer]) {
    println!("{title}:");
    rows.iter().for_each(|offer| {
        println!(
            "  {} / {} / {}",
            offer.ship,
            offer.category,
            offer.port.unwrap_or("-")
        );
    });
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("offer_search=debug")),
        )
        .init();

    let start = Instant::now();
    let mut search = AdvancedSearch::new(Offers, MemoryStore::new(), SearchConfig::default());
    search.select_profile(Some("gobo-1234"));
    search.set_enabled(true);

    // Commit a closed-set predicate picked from the suggestions
    let suggestions = search.suggestions("ship", &OFFERS);
    println!("Ships: {}", suggestions.join(", "));
    let ships = search.add_draft("ship").unwrap();
    search.set_operator(&ships, Operator::In, start).unwrap();
    search
        .set_values(&ships, [&suggestions[0], &suggestions[3]], start)
        .unwrap();
    search.commit(&ships, start).unwrap();
    print("Committed", &search.evaluate(&OFFERS));

    // Type a substring into a draft, one keystroke every 80ms
    let categories = search.add_draft("category").unwrap();
    search.set_operator(&categories, Operator::NotContains, start).unwrap();
    let mut now = start;
    for typed in ["s", "su", "sui", "suit"] {
        now += Duration::from_millis(80);
        search.set_values(&categories, [typed], now).unwrap();
    }
    while let Some(deadline) = search.next_deadline() {
        for event in search.tick(deadline) {
            match event {
                Event::PreviewReady(id) => {
                    println!("Preview of {id} is ready");
                    print("Previewed", &search.evaluate(&OFFERS));
                }
                Event::Persisted { profile } => println!("Persisted the predicates of {profile}"),
            }
        }
    }

    search.commit(&categories, now).unwrap();
    search.hide_group("Departure Port: Miami");
    print("Visible", &search.filter_offers(&OFFERS));
    println!("{} predicate(s) applied", search.committed_count());
}
