//! Product Application Service
//!
//! Orchestrates catalog operations through the repository port and decorates
//! outbound products with a derived USD price.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use exchange_rates::{PriceEnricher, RateSource};

use catalog_types::{
    AppError, CreateProductRequest, NewProduct, Page, PageRequest, PageResponse, Product, ProductCode,
    ProductRepository, ProductResponse,
};

/// Application service for catalog operations.
///
/// Generic over `R: ProductRepository` and `S: RateSource`; both adapters are
/// injected at compile time.
pub struct ProductService<R: ProductRepository, S: RateSource> {
    repo: R,
    enricher: PriceEnricher<S>,
}

impl<R: ProductRepository, S: RateSource> ProductService<R, S> {
    pub fn new(repo: R, rates: S) -> Self {
        Self {
            repo,
            enricher: PriceEnricher::new(rates),
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Validates and stores a new product.
    pub async fn create_product(
        &self,
        req: CreateProductRequest,
    ) -> Result<ProductResponse, AppError> {
        let product = NewProduct::validate(req)?;

        if self.repo.find_by_code(&product.code).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Product with code {} already exists.",
                product.code
            )));
        }

        // A concurrent insert can still win the race; the unique index reports it as Conflict.
        let created = self.repo.create_product(product).await?;
        tracing::info!(code = %created.code, id = created.id, "Product created");

        Ok(self.to_response(created, today()).await)
    }

    /// Looks a product up by its code.
    pub async fn get_product(&self, code: &str) -> Result<ProductResponse, AppError> {
        let code: ProductCode = code.parse()?;

        let product = self
            .repo
            .find_by_code(&code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product with code {} not found.", code)))?;

        Ok(self.to_response(product, today()).await)
    }

    /// Lists one page of products.
    pub async fn list_products(
        &self,
        request: PageRequest,
    ) -> Result<PageResponse<ProductResponse>, AppError> {
        let Page {
            content: products,
            page,
            size,
            total_elements,
        } = self.repo.list_products(&request).await?;

        // One rate lookup per page.
        let rate = if products.is_empty() {
            None
        } else {
            self.enricher.usd_rate(today()).await
        };
        let content: Vec<ProductResponse> = products
            .into_iter()
            .map(|product| {
                let price_usd = PriceEnricher::<S>::convert(Some(product.price_eur), rate);
                response(product, price_usd)
            })
            .collect();

        Ok(Page {
            content,
            page,
            size,
            total_elements,
        }
        .into())
    }

    async fn to_response(&self, product: Product, date: NaiveDate) -> ProductResponse {
        let price_usd = self.enricher.usd_price(Some(product.price_eur), date).await;
        response(product, price_usd)
    }
}

fn response(product: Product, price_usd: Option<Decimal>) -> ProductResponse {
    ProductResponse {
        code: product.code.into_inner(),
        name: product.name,
        price_eur: product.price_eur,
        price_usd,
        available: product.available,
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
