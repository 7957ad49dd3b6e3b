mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{days_from_now, professional, TestApp};

#[tokio::test]
async fn list_and_retrieve_are_public() -> Result<()> {
    let app = TestApp::new();
    let tokens = app.register("admin").await?;
    let id = app.create_professional(&tokens.access, "Dra. Ana", "ana@teste.com").await?;

    let res = app.get("/profissionais/").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data().as_array().map(Vec::len), Some(1));

    let res = app.get(&format!("/profissionais/{}/", id)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["nome"], "Dra. Ana");
    assert_eq!(res.data()["nome_exibicao"], "Dra. Ana");
    assert_eq!(res.data()["ativo"], true);
    Ok(())
}

#[tokio::test]
async fn mutations_require_authentication() -> Result<()> {
    let app = TestApp::new();

    let res = app.post("/profissionais/", professional("Dr. X", "x@teste.com")).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.body["message"],
        "As credenciais de autenticação não foram fornecidas."
    );
    Ok(())
}

#[tokio::test]
async fn display_name_prefers_social_name() -> Result<()> {
    let app = TestApp::new();
    let tokens = app.register("admin").await?;

    let mut body = professional("João Silva", "joao@teste.com");
    body["nome_social"] = json!("Joana Silva");
    let res = app.post_auth("/profissionais/", &tokens.access, body).await?;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["nome"], "João Silva");
    assert_eq!(res.data()["nome_exibicao"], "Joana Silva");
    Ok(())
}

#[tokio::test]
async fn create_validates_fields() -> Result<()> {
    let app = TestApp::new();
    let tokens = app.register("admin").await?;

    let res = app
        .post_auth(
            "/profissionais/",
            &tokens.access,
            json!({
                "nome": "   ",
                "especialidade": "",
                "email": "nao-e-email",
                "telefone": "123",
            }),
        )
        .await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    for field in ["nome", "especialidade", "email", "telefone"] {
        assert!(!res.field_errors(field).is_empty(), "{}", field);
    }
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let tokens = app.register("admin").await?;
    app.create_professional(&tokens.access, "Dra. Ana", "ana@teste.com").await?;

    let res = app
        .post_auth("/profissionais/", &tokens.access, professional("Outra Ana", "ana@teste.com"))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(!res.field_errors("email").is_empty());
    Ok(())
}

#[tokio::test]
async fn list_is_ordered_by_name_and_hides_inactive() -> Result<()> {
    let app = TestApp::new();
    let tokens = app.register("admin").await?;
    app.create_professional(&tokens.access, "Carlos", "carlos@teste.com").await?;
    let bruno = app.create_professional(&tokens.access, "Bruno", "bruno@teste.com").await?;
    app.create_professional(&tokens.access, "Amanda", "amanda@teste.com").await?;

    let res = app
        .patch_auth(&format!("/profissionais/{}/", bruno), &tokens.access, json!({"ativo": false}))
        .await?;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get("/profissionais/").await?;
    let names: Vec<_> = res
        .data()
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|p| p["nome"].as_str())
        .collect();
    assert_eq!(names, ["Amanda", "Carlos"]);

    // Still retrievable by id
    let res = app.get(&format!("/profissionais/{}/", bruno)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["ativo"], false);
    Ok(())
}

#[tokio::test]
async fn partial_update_changes_only_submitted_fields() -> Result<()> {
    let app = TestApp::new();
    let tokens = app.register("admin").await?;
    let id = app.create_professional(&tokens.access, "Dra. Ana", "ana@teste.com").await?;

    let res = app
        .patch_auth(
            &format!("/profissionais/{}/", id),
            &tokens.access,
            json!({"especialidade": "Cardiologia", "telefone": "(21) 3333-4444"}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["especialidade"], "Cardiologia");
    assert_eq!(res.data()["telefone"], "(21) 3333-4444");
    assert_eq!(res.data()["nome"], "Dra. Ana");

    let res = app
        .patch_auth(&format!("/profissionais/{}/", id), &tokens.access, json!({"telefone": "abc"}))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(!res.field_errors("telefone").is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_professional_is_not_found() -> Result<()> {
    let app = TestApp::new();
    let tokens = app.register("admin").await?;

    assert_eq!(app.get("/profissionais/999/").await?.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.delete_auth("/profissionais/999/", &tokens.access).await?.status,
        StatusCode::NOT_FOUND
    );
    Ok(())
}

#[tokio::test]
async fn delete_cascades_to_appointments() -> Result<()> {
    let app = TestApp::new();
    let tokens = app.register("admin").await?;
    let prof = app.create_professional(&tokens.access, "Dra. Ana", "ana@teste.com").await?;
    let first = app.create_appointment(&tokens.access, prof, &days_from_now(1, 10)).await?;
    let second = app.create_appointment(&tokens.access, prof, &days_from_now(2, 10)).await?;

    let res = app.delete_auth(&format!("/profissionais/{}/", prof), &tokens.access).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(res.body.is_null());

    assert_eq!(app.get(&format!("/profissionais/{}/", prof)).await?.status, StatusCode::NOT_FOUND);
    for id in [first, second] {
        assert_eq!(app.get(&format!("/consultas/{}/", id)).await?.status, StatusCode::NOT_FOUND);
    }
    Ok(())
}

#[tokio::test]
async fn malformed_id_is_json_not_found() -> Result<()> {
    let app = TestApp::new();
    let tokens = app.register("admin").await?;

    let res = app.get("/profissionais/abc/").await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Profissional não encontrado.");

    let res = app
        .patch_auth("/profissionais/-/", &tokens.access, json!({"nome": "Outro"}))
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["code"], "NOT_FOUND");
    Ok(())
}
