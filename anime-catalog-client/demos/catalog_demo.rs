use anime_catalog_client::{CatalogClient, CatalogConfig, CatalogQuery, CatalogSort};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let client = CatalogClient::new(CatalogConfig::default());
    let query = CatalogQuery::new()
        .with_genre("Adventure")
        .with_min_rating(8.5)
        .with_sort(CatalogSort::TitleAsc);

    println!("=== Top rated adventure ===");
    let start = std::time::Instant::now();
    let first = client.search(&query).await?;
    println!("First search took: {:?}", start.elapsed());
    for anime in &first {
        println!("  {:>6}  {:<50} {:.2}", anime.id, anime.title, anime.rating);
    }

    let start = std::time::Instant::now();
    let second = client.search(&query).await?;
    println!("Cached search took: {:?} ({} items)", start.elapsed(), second.len());

    println!("\n=== Concurrent lookups ===");
    let (a, b) = tokio::join!(client.get_by_id("5114"), client.get_by_id("5114"));
    println!("{:?}\n{:?}", a.map(|anime| anime.title), b.map(|anime| anime.title));

    println!("\nCache stats: {:#?}", client.cache_stats());

    Ok(())
}
