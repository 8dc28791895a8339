use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::middleware::{AuthMiddleware, AuthUser};
use crate::models::{
    AuthResponse, CartItemInput, CategoryInput, NewProduct, ProductResponse, RemoveProductInput,
    SetQuantityInput, SignInInput, SignUpInput,
};
use crate::state::AppState;
use crate::{auth, cart, catalog, upload};

type Handled = Result<HttpResponse, AppError>;

async fn root() -> HttpResponse {
    HttpResponse::Ok().body("API Root")
}

async fn login(state: web::Data<AppState>, data: web::Json<SignInInput>) -> Handled {
    let token = auth::login(&*state.users, &state.tokens, &data.email, &data.password).await?;
    Ok(HttpResponse::Ok().json(AuthResponse { success: true, token }))
}

async fn signup(state: web::Data<AppState>, data: web::Json<SignUpInput>) -> Handled {
    let token = auth::signup(
        &*state.users,
        &state.tokens,
        &data.username,
        &data.email,
        &data.password,
    )
    .await?;
    Ok(HttpResponse::Ok().json(AuthResponse { success: true, token }))
}

async fn get_user(state: web::Data<AppState>, user: AuthUser) -> Handled {
    let profile = auth::profile(&*state.users, &user.0).await?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn all_products(state: web::Data<AppState>) -> Handled {
    Ok(HttpResponse::Ok().json(catalog::list_all(&*state.products).await?))
}

async fn new_collections(state: web::Data<AppState>) -> Handled {
    Ok(HttpResponse::Ok().json(catalog::list_new_collections(&*state.products).await?))
}

async fn popular_in_women(state: web::Data<AppState>) -> Handled {
    Ok(HttpResponse::Ok().json(catalog::list_popular_in_women(&*state.products).await?))
}

async fn related_products(state: web::Data<AppState>, data: web::Json<CategoryInput>) -> Handled {
    let products = catalog::list_related(&*state.products, &data.category).await?;
    Ok(HttpResponse::Ok().json(products))
}

async fn add_product(state: web::Data<AppState>, data: web::Json<NewProduct>) -> Handled {
    let product = catalog::add_product(&*state.products, data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ProductResponse {
        success: true,
        name: Some(product.name),
    }))
}

async fn remove_product(
    state: web::Data<AppState>,
    data: web::Json<RemoveProductInput>,
) -> Handled {
    let RemoveProductInput { id, name } = data.into_inner();
    let removed = catalog::remove_product(&*state.products, id).await?;
    Ok(HttpResponse::Ok().json(ProductResponse {
        success: true,
        name: removed.map(|p| p.name).or(name),
    }))
}

async fn add_to_cart(
    state: web::Data<AppState>,
    user: AuthUser,
    data: web::Json<CartItemInput>,
) -> Handled {
    cart::add_to_cart(&*state.users, &user.0, data.item_id).await?;
    Ok(HttpResponse::Ok().body("Added"))
}

async fn remove_from_cart(
    state: web::Data<AppState>,
    user: AuthUser,
    data: web::Json<CartItemInput>,
) -> Handled {
    cart::remove_from_cart(&*state.users, &user.0, data.item_id).await?;
    Ok(HttpResponse::Ok().body("Removed"))
}

async fn get_cart(state: web::Data<AppState>, user: AuthUser) -> Handled {
    Ok(HttpResponse::Ok().json(cart::get_cart(&*state.users, &user.0).await?))
}

async fn set_cart(
    state: web::Data<AppState>,
    user: AuthUser,
    data: web::Json<SetQuantityInput>,
) -> Handled {
    cart::set_quantity(&*state.users, &user.0, data.item_id, data.quantity).await?;
    Ok(HttpResponse::Ok().body("Updated"))
}

async fn clear_cart(state: web::Data<AppState>, user: AuthUser) -> Handled {
    cart::clear_cart(&*state.users, &user.0).await?;
    Ok(HttpResponse::Ok().body("Cleared"))
}

/// Registers every endpoint. Cart and profile routes sit behind the token
/// middleware; catalog administration is open.
pub fn configure(cfg: &mut web::ServiceConfig, state: &web::Data<AppState>) {
    let guarded = || AuthMiddleware::new(state.tokens.clone());

    cfg.app_data(state.clone())
        .route("/", web::get().to(root))
        .route("/login", web::post().to(login))
        .route("/signup", web::post().to(signup))
        .route("/allproducts", web::get().to(all_products))
        .route("/newcollections", web::get().to(new_collections))
        .route("/popularinwomen", web::get().to(popular_in_women))
        .route("/relatedproducts", web::post().to(related_products))
        .route("/addproduct", web::post().to(add_product))
        .route("/removeproduct", web::post().to(remove_product))
        .route("/upload", web::post().to(upload::upload_image))
        .service(
            web::resource("/addtocart")
                .wrap(guarded())
                .route(web::post().to(add_to_cart)),
        )
        .service(
            web::resource("/removefromcart")
                .wrap(guarded())
                .route(web::post().to(remove_from_cart)),
        )
        .service(
            web::resource("/getcart")
                .wrap(guarded())
                .route(web::post().to(get_cart)),
        )
        .service(
            web::resource("/setcart")
                .wrap(guarded())
                .route(web::post().to(set_cart)),
        )
        .service(
            web::resource("/clearcart")
                .wrap(guarded())
                .route(web::post().to(clear_cart)),
        )
        .service(
            web::resource("/getuser")
                .wrap(guarded())
                .route(web::get().to(get_user))
                .route(web::post().to(get_user)),
        )
        .service(actix_files::Files::new(upload::IMAGE_ROUTE, &state.upload_dir));
}
